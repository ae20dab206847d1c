//! # Classifier Worker Pool
//!
//! Async facade over the synchronous pipeline. A fixed set of OS threads each
//! owns an [`ImageProcessingContext`] and pulls jobs from a shared queue.
//! Callers await a oneshot reply under the configured time budget.
//!
//! # Time Budget
//!
//! The budget covers queueing and processing. A job whose deadline has
//! passed before a worker picks it up is never started. Either way the
//! caller receives the handwritten fallback with
//! [`FallbackReason::Timeout`](crate::classifier::FallbackReason::Timeout).
//! Decode errors are still returned as errors.
//!
//! # Shutdown
//!
//! Dropping the pool closes the queue, lets each worker finish its current
//! job and joins the threads.

use std::sync::{mpsc, Arc};
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::analysis::types::{ModelDecision, RoutingModel};
use crate::classifier::{self, ClassificationReport};
use crate::config::ClassifierConfig;
use crate::context::ImageProcessingContext;
use crate::errors::{ClassifierError, ClassifierResult};
use crate::observability::{record_classification_metrics, ClassificationOutcome};

type JobReply = oneshot::Sender<ClassifierResult<ClassificationReport>>;

struct Job {
    image_bytes: Vec<u8>,
    deadline: Instant,
    with_diagnostics: bool,
    reply: JobReply,
}

/// Fixed-size pool of classification workers
pub struct ClassifierPool {
    sender: Option<mpsc::Sender<Job>>,
    workers: Vec<thread::JoinHandle<()>>,
    threshold: f64,
    timeout: Duration,
}

impl ClassifierPool {
    /// Validate the configuration and start the worker threads
    ///
    /// # Errors
    ///
    /// - `Config` - the configuration failed validation
    /// - `Worker` - a worker thread could not be spawned
    pub fn new(config: ClassifierConfig) -> ClassifierResult<Self> {
        config.validate()?;
        let threads = config.worker.effective_threads();
        let timeout = Duration::from_millis(config.worker.timeout_ms);
        let threshold = config.scoring.decision_threshold;

        let (sender, receiver) = mpsc::channel::<Job>();
        let receiver = Arc::new(Mutex::new(receiver));
        let mut workers = Vec::with_capacity(threads);
        for index in 0..threads {
            let receiver = Arc::clone(&receiver);
            let context = ImageProcessingContext::from_validated(config.clone());
            let handle = thread::Builder::new()
                .name(format!("receipt-worker-{}", index))
                .spawn(move || worker_loop(index, &context, &receiver))
                .map_err(|e| {
                    ClassifierError::Worker(format!("Failed to spawn worker thread {}: {}", index, e))
                })?;
            workers.push(handle);
        }

        info!(
            target: "receipt_classifier",
            threads,
            timeout_ms = config.worker.timeout_ms,
            "Started classifier pool"
        );

        Ok(Self {
            sender: Some(sender),
            workers,
            threshold,
            timeout,
        })
    }

    /// Number of worker threads
    pub fn threads(&self) -> usize {
        self.workers.len()
    }

    /// Classify one image within the time budget
    pub async fn classify(&self, image_bytes: Vec<u8>) -> ClassifierResult<ModelDecision> {
        self.submit(image_bytes, false)
            .await
            .map(|report| report.decision)
    }

    /// Classify one image and return the full diagnostic report
    pub async fn analyze(&self, image_bytes: Vec<u8>) -> ClassifierResult<ClassificationReport> {
        self.submit(image_bytes, true).await
    }

    async fn submit(
        &self,
        image_bytes: Vec<u8>,
        with_diagnostics: bool,
    ) -> ClassifierResult<ClassificationReport> {
        let sender = self
            .sender
            .as_ref()
            .ok_or_else(|| ClassifierError::Worker("Classifier pool is shut down".to_string()))?;

        let (reply, response) = oneshot::channel();
        let job = Job {
            image_bytes,
            deadline: Instant::now() + self.timeout,
            with_diagnostics,
            reply,
        };
        sender
            .send(job)
            .map_err(|_| ClassifierError::Worker("All classifier workers have exited".to_string()))?;

        match tokio::time::timeout(self.timeout, response).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(ClassifierError::Worker(
                "Worker dropped the job without replying".to_string(),
            )),
            Err(_) => {
                let budget_ms = self.timeout.as_millis() as u64;
                warn!(
                    target: "receipt_classifier",
                    budget_ms,
                    fallback = "handwritten_model",
                    "Classification exceeded its time budget"
                );
                record_classification_metrics(
                    RoutingModel::HandwrittenModel,
                    ClassificationOutcome::TimedOut,
                    self.timeout,
                );
                Ok(ClassificationReport::timed_out(self.threshold, budget_ms))
            }
        }
    }
}

impl Drop for ClassifierPool {
    fn drop(&mut self) {
        drop(self.sender.take());
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                warn!(target: "receipt_classifier", "Classifier worker exited with a panic");
            }
        }
    }
}

fn worker_loop(index: usize, context: &ImageProcessingContext, receiver: &Mutex<mpsc::Receiver<Job>>) {
    loop {
        // The lock is released as soon as a job is dequeued
        let next = receiver.lock().recv();
        let Ok(job) = next else {
            break;
        };
        handle_job(context, job);
    }
    debug!(target: "receipt_classifier", worker = index, "Classifier worker stopped");
}

fn handle_job(context: &ImageProcessingContext, job: Job) {
    if job.reply.is_closed() {
        debug!(target: "receipt_classifier", "Caller gone, skipping job");
        return;
    }

    let result = if Instant::now() >= job.deadline {
        let budget_ms = context.config().worker.timeout_ms;
        debug!(
            target: "receipt_classifier",
            budget_ms,
            "Deadline passed before the job started"
        );
        Ok(ClassificationReport::timed_out(
            context.config().scoring.decision_threshold,
            budget_ms,
        ))
    } else if job.with_diagnostics {
        classifier::analyze_receipt(context, &job.image_bytes)
    } else {
        classifier::classify_report(context, &job.image_bytes)
    };

    // The caller may have timed out in the meantime
    let _ = job.reply.send(result);
}
