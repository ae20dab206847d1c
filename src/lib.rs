//! # Receipt Classifier
//!
//! Decides, from a photo of a purchase receipt, whether the item table is
//! machine-printed or handwritten, and routes the receipt to the matching
//! downstream OCR model. Ambiguous or failed analyses route to the
//! handwritten model.
//!
//! The core pipeline is synchronous and reentrant: build an
//! [`ImageProcessingContext`] once and call [`ImageProcessingContext::classify`]
//! from any thread. Async services use [`ClassifierPool`].

pub mod analysis;
pub mod classifier;
pub mod config;
pub mod context;
pub mod errors;
pub mod evaluation;
pub mod observability;
pub mod preprocessing;
pub mod visualization;
pub mod worker;

// Re-export types for easier access
pub use analysis::types::{ModelDecision, Rect, RoutingModel};
pub use classifier::{ClassificationReport, FallbackReason};
pub use config::{ClassifierConfig, ScoringWeights};
pub use context::ImageProcessingContext;
pub use errors::{ClassifierError, ClassifierResult};
pub use worker::ClassifierPool;
