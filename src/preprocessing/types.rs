//! # Shared Types for Image Preprocessing
//!
//! This module contains the raster representation shared by every pipeline
//! stage and the result structs returned by the preprocessing sub-modules.

use image::{DynamicImage, GrayImage, RgbImage};

use crate::errors::{ClassifierError, ClassifierResult};

/// A decoded receipt image.
///
/// The grayscale plane drives every analysis stage. The color plane is kept
/// only when the source had color, for annotated output.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterImage {
    gray: GrayImage,
    color: Option<RgbImage>,
}

impl RasterImage {
    /// Build a raster from its planes. Both dimensions must be positive and the
    /// planes must agree in size.
    pub fn new(gray: GrayImage, color: Option<RgbImage>) -> ClassifierResult<Self> {
        let (width, height) = gray.dimensions();
        if width == 0 || height == 0 {
            return Err(ClassifierError::Decode(format!(
                "image has an empty dimension ({}x{})",
                width, height
            )));
        }
        if let Some(color) = &color {
            if color.dimensions() != (width, height) {
                return Err(ClassifierError::Decode(format!(
                    "color plane {:?} does not match grayscale plane {:?}",
                    color.dimensions(),
                    (width, height)
                )));
            }
        }
        Ok(Self { gray, color })
    }

    /// Build a raster from a decoded image
    pub fn from_dynamic(image: &DynamicImage) -> ClassifierResult<Self> {
        let color = image.color().has_color().then(|| image.to_rgb8());
        Self::new(image.to_luma8(), color)
    }

    /// Grayscale-only raster
    pub fn from_gray(gray: GrayImage) -> ClassifierResult<Self> {
        Self::new(gray, None)
    }

    pub fn gray(&self) -> &GrayImage {
        &self.gray
    }

    pub fn color(&self) -> Option<&RgbImage> {
        self.color.as_ref()
    }

    pub fn width(&self) -> u32 {
        self.gray.width()
    }

    pub fn height(&self) -> u32 {
        self.gray.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.gray.dimensions()
    }

    /// Color view for drawing; grayscale sources are expanded to RGB
    pub fn to_rgb(&self) -> RgbImage {
        match &self.color {
            Some(color) => color.clone(),
            None => DynamicImage::ImageLuma8(self.gray.clone()).to_rgb8(),
        }
    }

    pub(crate) fn into_parts(self) -> (GrayImage, Option<RgbImage>) {
        (self.gray, self.color)
    }
}

/// Result of decoding and bounding the working resolution
#[derive(Debug, Clone)]
pub struct NormalizedImage {
    /// The working-resolution raster
    pub image: RasterImage,
    /// Decoded image dimensions (width, height)
    pub original_dimensions: (u32, u32),
    /// Scale factor applied (1.0 when no resize happened)
    pub scale_factor: f32,
    /// Processing time in milliseconds
    pub processing_time_ms: u32,
}

/// Result of skew estimation and correction.
#[derive(Debug, Clone)]
pub struct DeskewResult {
    /// The corrected image, or the input unchanged
    pub image: RasterImage,
    /// Median line angle in degrees, `None` when no line was found
    pub skew_angle_degrees: Option<f32>,
    /// Whether a rotation was applied
    pub rotated: bool,
    /// Number of voting lines that contributed to the estimate
    pub line_count: usize,
    /// Processing time in milliseconds
    pub processing_time_ms: u32,
}

/// Result of a morphological operation on a binary mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MorphologicalOperation {
    /// Erosion followed by dilation; removes isolated specks
    Opening,
    /// Dilation followed by erosion; bridges small gaps in strokes
    Closing,
}
