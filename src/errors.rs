//! # Classifier Error Types
//!
//! This module defines the error types used throughout the receipt classifier.
//! Only [`ClassifierError`] ever reaches a caller. [`StageError`] is produced
//! by individual pipeline stages and is absorbed by the pipeline according to
//! the fallback policy in [`crate::classifier::decision_for_stage_error`].

use std::fmt;

/// Errors surfaced to callers of the classifier
#[derive(Debug, Clone, PartialEq)]
pub enum ClassifierError {
    /// The input bytes are not a decodable image; no decision can be produced
    Decode(String),
    /// Configuration validation errors
    Config(String),
    /// The worker pool is shut down or a worker disappeared
    Worker(String),
    /// An annotated image could not be encoded
    Encode(String),
}

impl fmt::Display for ClassifierError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassifierError::Decode(msg) => write!(f, "[DECODE] Failed to decode image: {}", msg),
            ClassifierError::Config(msg) => write!(f, "[CONFIG] {}", msg),
            ClassifierError::Worker(msg) => write!(f, "[WORKER] {}", msg),
            ClassifierError::Encode(msg) => write!(f, "[ENCODE] Failed to encode image: {}", msg),
        }
    }
}

impl std::error::Error for ClassifierError {}

impl From<image::ImageError> for ClassifierError {
    fn from(err: image::ImageError) -> Self {
        ClassifierError::Decode(err.to_string())
    }
}

/// Result type alias for convenience
pub type ClassifierResult<T> = Result<T, ClassifierError>;

/// Pipeline stages, used to attribute absorbed failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    SkewCorrection,
    CharacterExtraction,
    BlockAnalysis,
    Decision,
    /// Failure that could not be attributed to a single stage
    Pipeline,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::SkewCorrection => "skew_correction",
            Stage::CharacterExtraction => "character_extraction",
            Stage::BlockAnalysis => "block_analysis",
            Stage::Decision => "decision",
            Stage::Pipeline => "pipeline",
        };
        f.write_str(name)
    }
}

/// Internal per-stage failure
#[derive(Debug, Clone, PartialEq)]
pub enum StageError {
    /// Skew correction failed; the pipeline continues with the unrotated image
    TransformFailure(String),
    /// Any other stage failed; the pipeline resolves to the safe fallback decision
    StageFailure { stage: Stage, message: String },
}

impl StageError {
    pub fn failure(stage: Stage, message: impl Into<String>) -> Self {
        StageError::StageFailure {
            stage,
            message: message.into(),
        }
    }
}

impl fmt::Display for StageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageError::TransformFailure(msg) => {
                write!(f, "[TRANSFORM] Skew correction failed: {}", msg)
            }
            StageError::StageFailure { stage, message } => {
                write!(f, "[STAGE:{}] {}", stage, message)
            }
        }
    }
}

impl std::error::Error for StageError {}

/// Result type alias for pipeline stages
pub type StageResult<T> = Result<T, StageError>;

/// Standardized error logging utilities for absorbed failures
pub mod error_logging {
    use tracing::warn;

    /// Log a stage failure that was absorbed by a documented fallback
    pub fn log_absorbed_failure(
        error: &impl std::fmt::Display,
        fallback: &str,
        image_dimensions: Option<(u32, u32)>,
    ) {
        warn!(
            target: "receipt_classifier",
            error = %error,
            fallback = %fallback,
            image_dimensions = ?image_dimensions,
            "Pipeline stage failed, applying fallback"
        );
    }
}
