//! # Image Processing Context
//!
//! Per-worker state for the classification pipeline: the validated
//! configuration plus parameters derived from it once, so each image does not
//! pay for them again. A context is plain owned data; each worker thread
//! builds its own.

use crate::analysis::regions::intensity_levels;
use crate::analysis::types::ModelDecision;
use crate::classifier::{self, ClassificationReport};
use crate::config::ClassifierConfig;
use crate::errors::ClassifierResult;

/// Reusable, validated pipeline context
#[derive(Debug, Clone)]
pub struct ImageProcessingContext {
    config: ClassifierConfig,
    intensity_levels: Vec<u8>,
}

impl ImageProcessingContext {
    /// Validate the configuration and derive reusable parameters
    ///
    /// # Errors
    ///
    /// Returns [`crate::errors::ClassifierError::Config`] for an invalid configuration.
    pub fn new(config: ClassifierConfig) -> ClassifierResult<Self> {
        config.validate()?;
        Ok(Self::from_validated(config))
    }

    /// Build from a configuration that already passed validation
    pub(crate) fn from_validated(config: ClassifierConfig) -> Self {
        let intensity_levels = intensity_levels(config.regions.intensity_step);
        Self {
            config,
            intensity_levels,
        }
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Threshold ladder used by region detection
    pub fn intensity_levels(&self) -> &[u8] {
        &self.intensity_levels
    }

    /// Classify encoded image bytes
    pub fn classify(&self, image_bytes: &[u8]) -> ClassifierResult<ModelDecision> {
        classifier::classify_receipt(self, image_bytes)
    }

    /// Classify encoded image bytes and keep every intermediate result
    pub fn analyze(&self, image_bytes: &[u8]) -> ClassifierResult<ClassificationReport> {
        classifier::analyze_receipt(self, image_bytes)
    }
}

impl Default for ImageProcessingContext {
    fn default() -> Self {
        Self::from_validated(ClassifierConfig::default())
    }
}
