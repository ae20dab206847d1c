//! # Image Deskewing Module
//!
//! Estimates the global rotation of a photographed receipt from straight edges
//! (printed rows, table rules, paper borders) and rotates it back to horizontal.
//!
//! Estimation blurs the grayscale plane, runs Canny edge detection, and votes
//! for lines with a Hough transform. Each line angle is folded into
//! [-45°, 45°] and the median is taken as the skew. Correction rotates about
//! the image center onto an expanded canvas with bicubic interpolation and
//! edge-replicated borders.
//!
//! Skew correction never fails the pipeline: [`correct_skew`] absorbs any
//! rotation failure and hands back the input unchanged.

use image::{ImageBuffer, Pixel};
use imageproc::edges::canny;
use imageproc::filter::gaussian_blur_f32;
use imageproc::hough::{detect_lines, LineDetectionOptions};
use tracing;

use super::types::{DeskewResult, RasterImage};
use crate::config::SkewConfig;
use crate::errors::{error_logging, StageError, StageResult};

/// Outcome of line voting
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkewEstimate {
    /// Median folded angle in degrees, `None` when no line reached the vote threshold
    pub angle_degrees: Option<f32>,
    pub line_count: usize,
}

/// Detect and remove global skew.
///
/// When no line is found, or the median angle is below
/// `min_correction_degrees`, the returned image is pixel-identical to the
/// input. A rotation failure is logged and also yields the input unchanged.
pub fn correct_skew(image: &RasterImage, config: &SkewConfig) -> DeskewResult {
    let start_time = std::time::Instant::now();
    let estimate = estimate_skew_angle(image.gray(), config);

    let unchanged = |estimate: SkewEstimate| DeskewResult {
        image: image.clone(),
        skew_angle_degrees: estimate.angle_degrees,
        rotated: false,
        line_count: estimate.line_count,
        processing_time_ms: start_time.elapsed().as_millis() as u32,
    };

    let angle = match estimate.angle_degrees {
        Some(angle) if angle.abs() >= config.min_correction_degrees => angle,
        _ => {
            tracing::debug!(
                target: "receipt_preprocessing",
                angle = ?estimate.angle_degrees,
                lines = estimate.line_count,
                "Skew below correction threshold, keeping image"
            );
            return unchanged(estimate);
        }
    };

    match rotate_raster(image, angle) {
        Ok(rotated) => {
            let processing_time = start_time.elapsed();
            tracing::debug!(
                target: "receipt_preprocessing",
                angle,
                lines = estimate.line_count,
                new_width = rotated.width(),
                new_height = rotated.height(),
                "Deskewing completed in {}ms",
                processing_time.as_millis()
            );
            DeskewResult {
                image: rotated,
                skew_angle_degrees: Some(angle),
                rotated: true,
                line_count: estimate.line_count,
                processing_time_ms: processing_time.as_millis() as u32,
            }
        }
        Err(e) => {
            error_logging::log_absorbed_failure(&e, "unrotated image", Some(image.dimensions()));
            unchanged(estimate)
        }
    }
}

/// Estimate the global skew angle of a grayscale image.
///
/// Positive angles mean the content must be rotated counter-clockwise to
/// become horizontal.
pub fn estimate_skew_angle(gray: &image::GrayImage, config: &SkewConfig) -> SkewEstimate {
    let blurred = gaussian_blur_f32(gray, config.blur_sigma);
    let edges = canny(&blurred, config.canny_low, config.canny_high);
    let lines = detect_lines(
        &edges,
        LineDetectionOptions {
            vote_threshold: config.vote_threshold,
            suppression_radius: config.suppression_radius,
        },
    );

    let mut angles: Vec<f32> = lines
        .iter()
        .map(|line| fold_line_angle(line.angle_in_degrees as f32))
        .collect();

    SkewEstimate {
        angle_degrees: median(&mut angles),
        line_count: angles.len(),
    }
}

/// Fold a Hough normal angle (degrees from the x axis) into [-45, 45].
///
/// Angles are periodic mod 90 here: a horizontal row (normal at 90°) and a
/// vertical rule (normal at 0°) both mean no skew.
pub fn fold_line_angle(normal_degrees: f32) -> f32 {
    let folded = normal_degrees.rem_euclid(90.0);
    if folded > 45.0 {
        folded - 90.0
    } else {
        folded
    }
}

/// Median of a sample; the two middle values are averaged for even lengths
pub fn median(values: &mut [f32]) -> Option<f32> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}

/// Rotate both planes of a raster by `angle_degrees` (counter-clockwise positive)
pub fn rotate_raster(image: &RasterImage, angle_degrees: f32) -> StageResult<RasterImage> {
    let gray = rotate_expanded(image.gray(), angle_degrees)?;
    let color = image
        .color()
        .map(|color| rotate_expanded(color, angle_degrees))
        .transpose()?;
    RasterImage::new(gray, color).map_err(|e| StageError::TransformFailure(e.to_string()))
}

/// Rotate about the center onto a canvas large enough to hold every source pixel.
///
/// Output size is `(h|sin| + w|cos|, h|cos| + w|sin|)`, truncated. Sampling is
/// bicubic and out-of-range coordinates clamp to the nearest edge pixel.
pub fn rotate_expanded<P>(
    image: &ImageBuffer<P, Vec<u8>>,
    angle_degrees: f32,
) -> StageResult<ImageBuffer<P, Vec<u8>>>
where
    P: Pixel<Subpixel = u8>,
{
    if !angle_degrees.is_finite() {
        return Err(StageError::TransformFailure(format!(
            "rotation angle is not finite: {}",
            angle_degrees
        )));
    }

    let (width, height) = image.dimensions();
    let angle = (angle_degrees as f64).to_radians();
    let (sin_a, cos_a) = angle.sin_cos();
    let new_width = (height as f64 * sin_a.abs() + width as f64 * cos_a.abs()) as u32;
    let new_height = (height as f64 * cos_a.abs() + width as f64 * sin_a.abs()) as u32;
    if new_width == 0 || new_height == 0 {
        return Err(StageError::TransformFailure(format!(
            "degenerate rotation canvas {}x{} for {}x{} input",
            new_width, new_height, width, height
        )));
    }

    let src_cx = (width / 2) as f64;
    let src_cy = (height / 2) as f64;
    let dst_cx = new_width as f64 / 2.0;
    let dst_cy = new_height as f64 / 2.0;
    let channels = P::CHANNEL_COUNT as usize;

    let mut output = ImageBuffer::<P, Vec<u8>>::new(new_width, new_height);
    for (x, y, pixel) in output.enumerate_pixels_mut() {
        let dx = x as f64 - dst_cx;
        let dy = y as f64 - dst_cy;
        // Inverse of the forward map (dx, dy) = R(angle) * (sx - cx, sy - cy)
        let sx = src_cx + cos_a * dx - sin_a * dy;
        let sy = src_cy + sin_a * dx + cos_a * dy;

        let out = pixel.channels_mut();
        for (c, value) in out.iter_mut().enumerate().take(channels) {
            *value = sample_bicubic(image, sx, sy, c);
        }
    }
    Ok(output)
}

const CUBIC_A: f64 = -0.75;

fn cubic_weight(t: f64) -> f64 {
    let t = t.abs();
    if t <= 1.0 {
        ((CUBIC_A + 2.0) * t - (CUBIC_A + 3.0)) * t * t + 1.0
    } else if t < 2.0 {
        ((CUBIC_A * t - 5.0 * CUBIC_A) * t + 8.0 * CUBIC_A) * t - 4.0 * CUBIC_A
    } else {
        0.0
    }
}

fn sample_bicubic<P>(image: &ImageBuffer<P, Vec<u8>>, x: f64, y: f64, channel: usize) -> u8
where
    P: Pixel<Subpixel = u8>,
{
    let (width, height) = image.dimensions();
    let x0 = x.floor();
    let y0 = y.floor();
    let fx = x - x0;
    let fy = y - y0;

    let clamp_x = |v: f64| v.clamp(0.0, (width - 1) as f64) as u32;
    let clamp_y = |v: f64| v.clamp(0.0, (height - 1) as f64) as u32;

    let mut sum = 0.0;
    for j in -1..=2 {
        let wy = cubic_weight(fy - j as f64);
        let sy = clamp_y(y0 + j as f64);
        for i in -1..=2 {
            let wx = cubic_weight(fx - i as f64);
            let sx = clamp_x(x0 + i as f64);
            sum += image.get_pixel(sx, sy).channels()[channel] as f64 * wx * wy;
        }
    }
    sum.round().clamp(0.0, 255.0) as u8
}
