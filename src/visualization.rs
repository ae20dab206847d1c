//! Region overlays for tuning and debugging.
//!
//! Rectangles from a [`ClassificationReport`](crate::classifier::ClassificationReport)
//! live in the working frame: normalized and deskewed. [`visualize_regions`]
//! rebuilds that frame from the original bytes before drawing.

use std::io::Cursor;

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;

use crate::analysis::types::Rect;
use crate::context::ImageProcessingContext;
use crate::errors::{ClassifierError, ClassifierResult};
use crate::preprocessing::{correct_skew, decode_and_normalize, RasterImage};

pub const REGION_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
pub const LINE_THICKNESS: u32 = 2;

/// Draw region outlines on a color copy of `image`
pub fn render_regions(image: &RasterImage, regions: &[Rect]) -> RgbImage {
    let mut canvas = image.to_rgb();
    let (width, height) = canvas.dimensions();

    for region in regions {
        let Some(rect) = region.clamp_to(width, height) else {
            continue;
        };
        for t in 0..LINE_THICKNESS {
            let inner_w = rect.w.saturating_sub(2 * t);
            let inner_h = rect.h.saturating_sub(2 * t);
            if inner_w > 0 && inner_h > 0 {
                let outline = imageproc::rect::Rect::at((rect.x + t) as i32, (rect.y + t) as i32)
                    .of_size(inner_w, inner_h);
                draw_hollow_rect_mut(&mut canvas, outline, REGION_COLOR);
            }
        }
    }
    canvas
}

/// Decode `image_bytes`, rebuild the working frame, draw `regions` and
/// re-encode as JPEG
pub fn visualize_regions(
    context: &ImageProcessingContext,
    image_bytes: &[u8],
    regions: &[Rect],
) -> ClassifierResult<Vec<u8>> {
    let config = context.config();
    let normalized = decode_and_normalize(image_bytes, &config.normalizer)?;
    let deskewed = correct_skew(&normalized.image, &config.skew);
    let canvas = render_regions(&deskewed.image, regions);

    let mut encoded = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(canvas)
        .write_to(&mut encoded, ImageFormat::Jpeg)
        .map_err(|e| ClassifierError::Encode(e.to_string()))?;

    tracing::debug!(
        target: "receipt_classifier",
        regions = regions.len(),
        encoded_bytes = encoded.get_ref().len(),
        "Rendered region overlay"
    );
    Ok(encoded.into_inner())
}
