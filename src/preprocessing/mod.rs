//! # Image Preprocessing Module
//!
//! Everything that turns raw receipt bytes into a clean, upright grayscale
//! plane ready for analysis.
//!
//! The module is organized into focused sub-modules:
//! - `normalizer`: decoding and working-resolution bounding
//! - `deskewing`: line-voting skew estimation and rotation correction
//! - `thresholding`: inverted adaptive Gaussian binarization
//! - `filtering`: blur and rectangular-kernel morphology
//! - `types`: the shared raster type and result structs

pub mod deskewing;
pub mod filtering;
pub mod normalizer;
pub mod thresholding;
pub mod types;

// Re-export commonly used types and functions for convenience
pub use types::{DeskewResult, MorphologicalOperation, NormalizedImage, RasterImage};

pub use deskewing::{correct_skew, estimate_skew_angle};
pub use filtering::{apply_morphological_operation, reduce_noise};
pub use normalizer::{decode_and_normalize, normalize};
pub use thresholding::{adaptive_threshold_inverted, foreground_ratio};
