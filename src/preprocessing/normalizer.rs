//! # Image Normalization Module
//!
//! Decodes raw receipt bytes and bounds the working resolution so that every
//! downstream constant (pixel sizes, areas) is calibrated for the same scale.
//! Downscaling uses area averaging, which keeps thin print strokes visible
//! instead of aliasing them away.

use image::{DynamicImage, ImageBuffer, Pixel};
use tracing;

use super::types::{NormalizedImage, RasterImage};
use crate::config::NormalizerConfig;
use crate::errors::ClassifierResult;

/// Decode image bytes and normalize the result.
///
/// # Errors
///
/// Returns [`crate::errors::ClassifierError::Decode`] when the bytes are not a supported
/// image or decode to an image with an empty dimension.
pub fn decode_and_normalize(
    bytes: &[u8],
    config: &NormalizerConfig,
) -> ClassifierResult<NormalizedImage> {
    let decoded = image::load_from_memory(bytes)?;
    normalize(&decoded, config)
}

/// Bound the width of an already decoded image.
///
/// Images at most `max_working_width` wide are passed through unchanged.
/// Wider images are resized to exactly `max_working_width` with the height
/// scaled proportionally (never below one pixel).
pub fn normalize(
    image: &DynamicImage,
    config: &NormalizerConfig,
) -> ClassifierResult<NormalizedImage> {
    let start_time = std::time::Instant::now();
    let raster = RasterImage::from_dynamic(image)?;
    let (width, height) = raster.dimensions();

    let Some((new_width, new_height)) = working_dimensions(width, height, config.max_working_width)
    else {
        return Ok(NormalizedImage {
            image: raster,
            original_dimensions: (width, height),
            scale_factor: 1.0,
            processing_time_ms: start_time.elapsed().as_millis() as u32,
        });
    };

    let (gray, color) = raster.into_parts();
    let gray = resize_area(&gray, new_width, new_height);
    let color = color.map(|color| resize_area(&color, new_width, new_height));
    let resized = RasterImage::new(gray, color)?;

    let processing_time = start_time.elapsed();
    tracing::debug!(
        target: "receipt_preprocessing",
        original_width = width,
        original_height = height,
        new_width,
        new_height,
        "Downscaled image in {}ms",
        processing_time.as_millis()
    );

    Ok(NormalizedImage {
        image: resized,
        original_dimensions: (width, height),
        scale_factor: new_width as f32 / width as f32,
        processing_time_ms: processing_time.as_millis() as u32,
    })
}

/// Target dimensions, or `None` when the image already fits
pub fn working_dimensions(width: u32, height: u32, max_width: u32) -> Option<(u32, u32)> {
    if width <= max_width {
        return None;
    }
    let new_height = (height as u64 * max_width as u64 / width as u64).max(1) as u32;
    Some((max_width, new_height))
}

/// Area-averaging resize for 8-bit images of any channel layout.
///
/// Each destination pixel is the overlap-weighted mean of the source pixels it
/// covers. Applied separably, horizontal pass first.
pub fn resize_area<P>(
    image: &ImageBuffer<P, Vec<u8>>,
    new_width: u32,
    new_height: u32,
) -> ImageBuffer<P, Vec<u8>>
where
    P: Pixel<Subpixel = u8>,
{
    let (width, height) = image.dimensions();
    let channels = P::CHANNEL_COUNT as usize;
    let columns = area_weights(width, new_width);
    let rows = area_weights(height, new_height);

    // Horizontal pass: new_width x height, f32 accumulators
    let mut horizontal = vec![0f32; new_width as usize * height as usize * channels];
    for y in 0..height {
        for (dx, weights) in columns.iter().enumerate() {
            let base = (y as usize * new_width as usize + dx) * channels;
            for &(sx, weight) in weights {
                let pixel = image.get_pixel(sx, y).channels();
                for c in 0..channels {
                    horizontal[base + c] += pixel[c] as f32 * weight;
                }
            }
        }
    }

    let mut output = ImageBuffer::<P, Vec<u8>>::new(new_width, new_height);
    for (x, y, pixel) in output.enumerate_pixels_mut() {
        let out = pixel.channels_mut();
        for c in 0..channels {
            let value: f32 = rows[y as usize]
                .iter()
                .map(|&(sy, weight)| {
                    horizontal[(sy as usize * new_width as usize + x as usize) * channels + c]
                        * weight
                })
                .sum();
            out[c] = value.round().clamp(0.0, 255.0) as u8;
        }
    }
    output
}

/// Per destination index, the contributing source indices and their weights
fn area_weights(src_len: u32, dst_len: u32) -> Vec<Vec<(u32, f32)>> {
    let scale = src_len as f64 / dst_len as f64;
    (0..dst_len)
        .map(|d| {
            let start = d as f64 * scale;
            let end = (start + scale).min(src_len as f64);
            let mut weights = Vec::new();
            let mut s = start.floor() as u32;
            while (s as f64) < end && s < src_len {
                let overlap = end.min(s as f64 + 1.0) - start.max(s as f64);
                if overlap > 0.0 {
                    weights.push((s, overlap));
                }
                s += 1;
            }
            let total: f64 = weights.iter().map(|(_, w)| w).sum();
            weights
                .into_iter()
                .map(|(s, w)| (s, (w / total) as f32))
                .collect()
        })
        .collect()
}
