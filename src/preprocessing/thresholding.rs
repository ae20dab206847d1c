//! # Image Thresholding Module
//!
//! Locally-normalized binarization shared by glyph extraction and block
//! texture analysis. The output is an inverted mask: dark ink on light paper
//! becomes foreground (255) on background (0).

use image::{GrayImage, Luma};
use imageproc::filter::gaussian_blur_f32;
use tracing;

use crate::config::AdaptiveThresholdConfig;

/// Adaptive Gaussian threshold, inverted.
///
/// A pixel is foreground when it is at least `offset` darker than the
/// Gaussian-weighted mean of its `block_size` neighbourhood. Uniform areas,
/// bright or dark, never produce foreground.
pub fn adaptive_threshold_inverted(gray: &GrayImage, config: &AdaptiveThresholdConfig) -> GrayImage {
    let start_time = std::time::Instant::now();
    let local_mean = gaussian_blur_f32(gray, config.sigma());

    let mut mask = GrayImage::new(gray.width(), gray.height());
    for (x, y, pixel) in mask.enumerate_pixels_mut() {
        let value = gray.get_pixel(x, y)[0] as f32;
        let mean = local_mean.get_pixel(x, y)[0] as f32;
        if value <= mean - config.offset {
            *pixel = Luma([255]);
        }
    }

    tracing::trace!(
        target: "receipt_preprocessing",
        width = gray.width(),
        height = gray.height(),
        "Adaptive threshold completed in {}us",
        start_time.elapsed().as_micros()
    );
    mask
}

/// Fraction of non-zero pixels in a mask; 0.0 for an empty mask
pub fn foreground_ratio(mask: &GrayImage) -> f64 {
    let total = mask.width() as u64 * mask.height() as u64;
    if total == 0 {
        return 0.0;
    }
    let foreground = mask.pixels().filter(|p| p[0] > 0).count() as u64;
    foreground as f64 / total as f64
}
