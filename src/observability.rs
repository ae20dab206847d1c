//! Observability setup for the classifier binaries and metric helpers for the
//! pipeline.
//!
//! This module provides:
//! - Structured logging with a configurable level and pretty or JSON output
//! - Classification counters and latency histograms through the `metrics` facade
//! - Spans for per-image work
//!
//! No exporter is installed here; an embedding service installs its own
//! `metrics` recorder and the counters flow into it.

use std::env;
use std::time::Duration;

use anyhow::Result;
use tracing_subscriber::prelude::*;

use crate::analysis::types::RoutingModel;

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservabilityConfig {
    /// Level for the classifier's own targets (trace, debug, info, warn, error)
    pub log_level: String,
    /// `pretty` for human-readable output, anything else for JSON
    pub log_format: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "json".to_string(),
        }
    }
}

impl ObservabilityConfig {
    /// Load configuration from `LOG_LEVEL` and `LOG_FORMAT`
    pub fn from_env() -> Self {
        Self {
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            log_format: env::var("LOG_FORMAT").unwrap_or_else(|_| "json".to_string()),
        }
    }

    pub fn is_pretty(&self) -> bool {
        self.log_format.eq_ignore_ascii_case("pretty")
    }

    /// Filter directives applied on top of `RUST_LOG`
    pub fn directives(&self) -> Vec<String> {
        ["receipt_classifier", "receipt_preprocessing", "receipt_analysis"]
            .iter()
            .map(|target| format!("{}={}", target, self.log_level))
            .collect()
    }
}

/// Initialize structured logging
///
/// Fails if a global subscriber is already installed or a directive does not parse.
pub fn init_tracing(config: &ObservabilityConfig) -> Result<()> {
    let mut filter = tracing_subscriber::EnvFilter::from_default_env();
    for directive in config.directives() {
        filter = filter.add_directive(directive.parse()?);
    }

    if config.is_pretty() {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .pretty()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_thread_names(false),
            )
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_thread_names(true),
            )
            .try_init()?;
    }

    tracing::info!(
        log_level = %config.log_level,
        log_format = %config.log_format,
        "Tracing initialized with structured logging"
    );
    Ok(())
}

/// Create a span for the classification of one image
pub fn classification_span(image_bytes: usize) -> tracing::Span {
    tracing::info_span!(
        "receipt_classification",
        image_bytes = image_bytes,
        component = "receipt_classifier"
    )
}

/// How a classification ended, for metric labels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassificationOutcome {
    /// The pipeline ran to a decision
    Completed,
    /// A stage failed and the fallback decision was used
    Fallback,
    /// The time budget ran out before the pipeline started or finished
    TimedOut,
}

impl ClassificationOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClassificationOutcome::Completed => "completed",
            ClassificationOutcome::Fallback => "fallback",
            ClassificationOutcome::TimedOut => "timed_out",
        }
    }
}

/// Record one classification
pub fn record_classification_metrics(
    model: RoutingModel,
    outcome: ClassificationOutcome,
    duration: Duration,
) {
    metrics::counter!(
        "receipt_classifications_total",
        "model" => model.label(),
        "outcome" => outcome.as_str()
    )
    .increment(1);
    metrics::histogram!("receipt_classification_duration_seconds").record(duration.as_secs_f64());
}

/// Record an undecodable input
pub fn record_decode_failure() {
    metrics::counter!("receipt_decode_failures_total").increment(1);
}
