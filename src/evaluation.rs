//! # Accuracy Evaluation
//!
//! Offline tuning support. A labeled dataset is a directory with a
//! `printed/` and a `handwritten/` subdirectory of receipt photos. Every
//! sample is classified, per-class accuracy is reported and the decision
//! threshold is swept over the recorded scores to find the best cut.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use crate::analysis::decision::decide;
use crate::analysis::types::RoutingModel;
use crate::context::ImageProcessingContext;

/// Extensions picked up from the class directories
pub const IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// Directory name holding the receipts of one class
pub fn class_directory(model: RoutingModel) -> &'static str {
    match model {
        RoutingModel::PrintedModel => "printed",
        RoutingModel::HandwrittenModel => "handwritten",
    }
}

/// An image path with its expected routing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabeledSample {
    pub path: PathBuf,
    pub expected: RoutingModel,
}

/// Collect the labeled images under `root`, sorted by path.
///
/// A missing class directory contributes no samples.
pub fn collect_labeled_samples(root: &Path) -> io::Result<Vec<LabeledSample>> {
    let mut samples = Vec::new();
    for expected in [RoutingModel::PrintedModel, RoutingModel::HandwrittenModel] {
        let dir = root.join(class_directory(expected));
        if !dir.is_dir() {
            debug!(target: "receipt_classifier", dir = %dir.display(), "Class directory missing");
            continue;
        }
        let mut paths = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.is_file() && has_image_extension(&path) {
                paths.push(path);
            }
        }
        paths.sort();
        samples.extend(paths.into_iter().map(|path| LabeledSample { path, expected }));
    }
    Ok(samples)
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false)
}

/// Result of classifying one labeled sample
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SampleOutcome {
    pub path: PathBuf,
    pub expected: RoutingModel,
    /// `None` when the sample could not be read or decoded
    pub predicted: Option<RoutingModel>,
    pub handwritten_score: Option<f64>,
    pub error: Option<String>,
    pub elapsed_ms: u64,
}

impl SampleOutcome {
    pub fn is_correct(&self) -> bool {
        self.predicted == Some(self.expected)
    }
}

/// Classify one sample; read and decode failures are recorded, not returned
pub fn evaluate_sample(context: &ImageProcessingContext, sample: &LabeledSample) -> SampleOutcome {
    let start_time = Instant::now();
    let result = fs::read(&sample.path)
        .map_err(|e| e.to_string())
        .and_then(|bytes| context.classify(&bytes).map_err(|e| e.to_string()));
    let elapsed_ms = start_time.elapsed().as_millis() as u64;

    match result {
        Ok(decision) => SampleOutcome {
            path: sample.path.clone(),
            expected: sample.expected,
            predicted: Some(decision.decision),
            handwritten_score: Some(decision.handwritten_score),
            error: None,
            elapsed_ms,
        },
        Err(error) => {
            warn!(
                target: "receipt_classifier",
                path = %sample.path.display(),
                error = %error,
                "Sample could not be classified"
            );
            SampleOutcome {
                path: sample.path.clone(),
                expected: sample.expected,
                predicted: None,
                handwritten_score: None,
                error: Some(error),
                elapsed_ms,
            }
        }
    }
}

/// Correct and total counts for one slice of the dataset
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ClassAccuracy {
    pub correct: usize,
    pub total: usize,
}

impl ClassAccuracy {
    fn record(&mut self, correct: bool) {
        self.total += 1;
        self.correct += usize::from(correct);
    }

    /// Fraction correct, 0.0 for an empty slice
    pub fn accuracy(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.correct as f64 / self.total as f64
        }
    }
}

/// Accuracy of the recorded scores re-decided at one threshold
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ThresholdPoint {
    pub threshold: f64,
    pub accuracy: f64,
    pub printed_accuracy: f64,
    pub handwritten_accuracy: f64,
}

/// Thresholds 0.10 through 0.95 in 0.05 steps
pub fn threshold_candidates() -> Vec<f64> {
    (2..=19).map(|k| f64::from(k * 5) / 100.0).collect()
}

/// Re-decide every scored outcome at each candidate threshold.
///
/// Outcomes without a score count as incorrect at every threshold.
pub fn sweep_thresholds(outcomes: &[SampleOutcome]) -> Vec<ThresholdPoint> {
    threshold_candidates()
        .into_iter()
        .map(|threshold| {
            let mut printed = ClassAccuracy::default();
            let mut handwritten = ClassAccuracy::default();
            let mut overall = ClassAccuracy::default();
            for outcome in outcomes {
                let correct = outcome
                    .handwritten_score
                    .map(|score| decide(score, threshold) == outcome.expected)
                    .unwrap_or(false);
                overall.record(correct);
                match outcome.expected {
                    RoutingModel::PrintedModel => printed.record(correct),
                    RoutingModel::HandwrittenModel => handwritten.record(correct),
                }
            }
            ThresholdPoint {
                threshold,
                accuracy: overall.accuracy(),
                printed_accuracy: printed.accuracy(),
                handwritten_accuracy: handwritten.accuracy(),
            }
        })
        .collect()
}

/// The lowest threshold reaching the highest accuracy
pub fn best_threshold(points: &[ThresholdPoint]) -> Option<ThresholdPoint> {
    points.iter().fold(None, |best: Option<ThresholdPoint>, point| match best {
        Some(current) if current.accuracy >= point.accuracy => Some(current),
        _ => Some(*point),
    })
}

/// Full evaluation result, serializable for the `--json` output
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationReport {
    pub generated_at: DateTime<Utc>,
    pub preset: String,
    pub threshold: f64,
    pub printed: ClassAccuracy,
    pub handwritten: ClassAccuracy,
    pub overall: ClassAccuracy,
    pub failures: usize,
    pub mean_elapsed_ms: f64,
    pub sweep: Vec<ThresholdPoint>,
    pub best: Option<ThresholdPoint>,
    pub samples: Vec<SampleOutcome>,
}

/// Aggregate outcomes produced with `preset` at `threshold`
pub fn summarize(outcomes: Vec<SampleOutcome>, preset: &str, threshold: f64) -> EvaluationReport {
    let mut printed = ClassAccuracy::default();
    let mut handwritten = ClassAccuracy::default();
    let mut overall = ClassAccuracy::default();
    for outcome in &outcomes {
        let correct = outcome.is_correct();
        overall.record(correct);
        match outcome.expected {
            RoutingModel::PrintedModel => printed.record(correct),
            RoutingModel::HandwrittenModel => handwritten.record(correct),
        }
    }

    let failures = outcomes.iter().filter(|o| o.error.is_some()).count();
    let mean_elapsed_ms = if outcomes.is_empty() {
        0.0
    } else {
        outcomes.iter().map(|o| o.elapsed_ms as f64).sum::<f64>() / outcomes.len() as f64
    };
    let sweep = sweep_thresholds(&outcomes);
    let best = best_threshold(&sweep);

    EvaluationReport {
        generated_at: Utc::now(),
        preset: preset.to_string(),
        threshold,
        printed,
        handwritten,
        overall,
        failures,
        mean_elapsed_ms,
        sweep,
        best,
        samples: outcomes,
    }
}

/// Classify every sample under `root` and summarize
pub fn evaluate_dataset(
    context: &ImageProcessingContext,
    root: &Path,
    preset: &str,
) -> io::Result<EvaluationReport> {
    let samples = collect_labeled_samples(root)?;
    let outcomes = samples
        .iter()
        .map(|sample| evaluate_sample(context, sample))
        .collect();
    Ok(summarize(
        outcomes,
        preset,
        context.config().scoring.decision_threshold,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(expected: RoutingModel, score: Option<f64>) -> SampleOutcome {
        SampleOutcome {
            path: PathBuf::from("sample.jpg"),
            expected,
            predicted: score.map(|s| decide(s, 0.35)),
            handwritten_score: score,
            error: score.is_none().then(|| "decode".to_string()),
            elapsed_ms: 10,
        }
    }

    #[test]
    fn test_threshold_candidates() {
        let candidates = threshold_candidates();
        assert_eq!(candidates.len(), 18);
        assert_eq!(candidates[0], 0.1);
        assert_eq!(candidates[1], 0.15);
        assert_eq!(candidates[17], 0.95);
    }

    #[test]
    fn test_sweep_finds_separating_threshold() {
        let outcomes = vec![
            outcome(RoutingModel::PrintedModel, Some(0.0)),
            outcome(RoutingModel::PrintedModel, Some(0.3)),
            outcome(RoutingModel::HandwrittenModel, Some(0.6)),
            outcome(RoutingModel::HandwrittenModel, Some(1.0)),
        ];
        let sweep = sweep_thresholds(&outcomes);
        let best = best_threshold(&sweep).unwrap();
        assert_eq!(best.accuracy, 1.0);
        // 0.30 is the first cut where the 0.3 printed sample is not above the threshold
        assert_eq!(best.threshold, 0.3);
        assert_eq!(best.printed_accuracy, 1.0);
    }

    #[test]
    fn test_failed_samples_are_never_correct() {
        let outcomes = vec![
            outcome(RoutingModel::HandwrittenModel, None),
            outcome(RoutingModel::HandwrittenModel, Some(1.0)),
        ];
        let report = summarize(outcomes, "baseline", 0.35);
        assert_eq!(report.failures, 1);
        assert_eq!(report.handwritten, ClassAccuracy { correct: 1, total: 2 });
        assert!(report.sweep.iter().all(|p| p.accuracy == 0.5));
        assert_eq!(report.printed.accuracy(), 0.0);
    }

    #[test]
    fn test_extension_filter() {
        assert!(has_image_extension(Path::new("a/receipt.JPG")));
        assert!(has_image_extension(Path::new("receipt.png")));
        assert!(!has_image_extension(Path::new("notes.txt")));
        assert!(!has_image_extension(Path::new("jpg")));
    }

    #[test]
    fn test_best_threshold_of_empty_sweep() {
        assert_eq!(best_threshold(&[]), None);
    }
}
