//! # Character Glyph Extraction
//!
//! Binarizes a crop with the inverted adaptive threshold, cleans the mask
//! with an opening then a closing, and turns each top-level outer contour
//! into a [`CharacterGlyph`] when it looks like a character.

use image::GrayImage;
use imageproc::contours::{find_contours, BorderType, Contour};
use tracing;

use super::types::{CharacterGlyph, Rect};
use crate::config::{AdaptiveThresholdConfig, GlyphConfig};
use crate::errors::{Stage, StageError, StageResult};
use crate::preprocessing::filtering::apply_morphological_operation;
use crate::preprocessing::thresholding::adaptive_threshold_inverted;
use crate::preprocessing::types::MorphologicalOperation;

/// Extract character glyphs from `crop` of `gray`.
///
/// Returned glyph rectangles are in the coordinate frame of `gray`.
///
/// # Errors
///
/// A crop that does not intersect the image is a stage failure.
pub fn extract_glyphs(
    gray: &GrayImage,
    crop: Rect,
    threshold: &AdaptiveThresholdConfig,
    config: &GlyphConfig,
) -> StageResult<Vec<CharacterGlyph>> {
    let crop = crop.clamp_to(gray.width(), gray.height()).ok_or_else(|| {
        StageError::failure(
            Stage::CharacterExtraction,
            format!("crop {} lies outside {}x{} image", crop, gray.width(), gray.height()),
        )
    })?;

    let sub_image = image::imageops::crop_imm(gray, crop.x, crop.y, crop.w, crop.h).to_image();
    let mask = adaptive_threshold_inverted(&sub_image, threshold);
    let opened = apply_morphological_operation(&mask, MorphologicalOperation::Opening, config.open_kernel);
    let cleaned = apply_morphological_operation(&opened, MorphologicalOperation::Closing, config.close_kernel);

    let glyphs: Vec<CharacterGlyph> = find_contours::<i32>(&cleaned)
        .iter()
        .filter(|contour| contour.border_type == BorderType::Outer && contour.parent.is_none())
        .filter_map(|contour| glyph_from_contour(contour, config))
        .map(|mut glyph| {
            for point in &mut glyph.contour {
                point.x += crop.x as i32;
                point.y += crop.y as i32;
            }
            CharacterGlyph {
                rect: glyph.rect.translate(crop.x, crop.y),
                center_y: (glyph.rect.center_y() + crop.y) as f64,
                ..glyph
            }
        })
        .collect();

    tracing::trace!(
        target: "receipt_analysis",
        crop = %crop,
        glyphs = glyphs.len(),
        "Extracted glyphs"
    );
    Ok(glyphs)
}

/// Apply the size, aspect, area and compactness filters to one contour
fn glyph_from_contour(contour: &Contour<i32>, config: &GlyphConfig) -> Option<CharacterGlyph> {
    let rect = bounding_rect(&contour.points)?;

    let side_ok = |side: u32| (config.min_side..=config.max_side).contains(&side);
    if !side_ok(rect.w) || !side_ok(rect.h) {
        return None;
    }
    let aspect = rect.aspect_ratio() as f32;
    if aspect < config.min_aspect || aspect > config.max_aspect {
        return None;
    }
    let area = polygon_area(&contour.points);
    if area < config.min_contour_area || area > config.max_contour_area {
        return None;
    }
    if area / (rect.area() as f64) < config.min_compactness {
        return None;
    }

    let angle_degrees = if contour.points.len() >= config.min_ellipse_points {
        orientation_degrees(&contour.points)
    } else {
        0.0
    };

    Some(CharacterGlyph {
        rect,
        angle_degrees,
        center_y: rect.center_y() as f64,
        contour_area: area,
        contour: contour.points.clone(),
    })
}

/// Inclusive pixel bounding box of a point set
pub fn bounding_rect(points: &[imageproc::point::Point<i32>]) -> Option<Rect> {
    let min_x = points.iter().map(|p| p.x).min()?;
    let max_x = points.iter().map(|p| p.x).max()?;
    let min_y = points.iter().map(|p| p.y).min()?;
    let max_y = points.iter().map(|p| p.y).max()?;
    if min_x < 0 || min_y < 0 {
        return None;
    }
    Some(Rect::new(
        min_x as u32,
        min_y as u32,
        (max_x - min_x + 1) as u32,
        (max_y - min_y + 1) as u32,
    ))
}

/// Area enclosed by a closed polygon through pixel centers (shoelace formula)
pub fn polygon_area(points: &[imageproc::point::Point<i32>]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let twice_area: i64 = points
        .iter()
        .zip(points.iter().cycle().skip(1))
        .map(|(a, b)| a.x as i64 * b.y as i64 - b.x as i64 * a.y as i64)
        .sum();
    twice_area.abs() as f64 / 2.0
}

/// Major-axis orientation from second-order central moments, in (-90, 90].
///
/// 0° is an upright glyph, ±90° a lying one. Symmetric point sets (equal
/// spread on both axes, no covariance) report 0°.
pub fn orientation_degrees(points: &[imageproc::point::Point<i32>]) -> f64 {
    let n = points.len() as i64;
    let (mut sx, mut sy, mut sxx, mut syy, mut sxy) = (0i64, 0i64, 0i64, 0i64, 0i64);
    for p in points {
        let (x, y) = (p.x as i64, p.y as i64);
        sx += x;
        sy += y;
        sxx += x * x;
        syy += y * y;
        sxy += x * y;
    }
    // n^2 times the central moments, exact in integers
    let mu20 = n * sxx - sx * sx;
    let mu02 = n * syy - sy * sy;
    let mu11 = n * sxy - sx * sy;
    if mu11 == 0 && mu20 == mu02 {
        return 0.0;
    }
    let angle = 0.5 * (2.0 * mu11 as f64).atan2((mu02 - mu20) as f64);
    angle.to_degrees().clamp(-90.0, 90.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;
    use imageproc::point::Point;

    fn draw_box(image: &mut GrayImage, rect: Rect, value: u8) {
        for y in rect.y..rect.bottom() {
            for x in rect.x..rect.right() {
                image.put_pixel(x, y, Luma([value]));
            }
        }
    }

    fn square_outline(x0: i32, y0: i32, side: i32) -> Vec<Point<i32>> {
        let last = side - 1;
        let mut points = Vec::new();
        for x in 0..last {
            points.push(Point::new(x0 + x, y0));
        }
        for y in 0..last {
            points.push(Point::new(x0 + last, y0 + y));
        }
        for x in (1..=last).rev() {
            points.push(Point::new(x0 + x, y0 + last));
        }
        for y in (1..=last).rev() {
            points.push(Point::new(x0, y0 + y));
        }
        points
    }

    #[test]
    fn test_polygon_area_and_bounds() {
        let outline = square_outline(5, 7, 20);
        assert_eq!(polygon_area(&outline), 361.0);
        assert_eq!(bounding_rect(&outline), Some(Rect::new(5, 7, 20, 20)));
        assert_eq!(polygon_area(&outline[..2]), 0.0);
    }

    #[test]
    fn test_orientation() {
        assert_eq!(orientation_degrees(&square_outline(0, 0, 10)), 0.0);

        let tall: Vec<Point<i32>> = (0..20).map(|y| Point::new(3, y)).collect();
        assert!(orientation_degrees(&tall).abs() < 1e-9);

        let wide: Vec<Point<i32>> = (0..20).map(|x| Point::new(x, 3)).collect();
        assert!((orientation_degrees(&wide).abs() - 90.0).abs() < 1e-9);

        let diagonal: Vec<Point<i32>> = (0..20).map(|i| Point::new(i, i)).collect();
        assert!((orientation_degrees(&diagonal).abs() - 45.0).abs() < 1e-9);
    }

    #[test]
    fn test_identical_squares_yield_identical_glyphs() {
        let mut gray = GrayImage::from_pixel(300, 60, Luma([255]));
        for i in 0..8 {
            draw_box(&mut gray, Rect::new(20 + i * 32, 20, 20, 20), 0);
        }
        let glyphs = extract_glyphs(
            &gray,
            Rect::new(0, 0, 300, 60),
            &AdaptiveThresholdConfig::default(),
            &GlyphConfig::default(),
        )
        .unwrap();

        assert_eq!(glyphs.len(), 8);
        for glyph in &glyphs {
            assert_eq!(glyph.rect.h, glyphs[0].rect.h);
            assert_eq!(glyph.rect.y, glyphs[0].rect.y);
            assert_eq!(glyph.angle_degrees, glyphs[0].angle_degrees);
            assert!(glyph.contour_area / glyph.rect.area() as f64 >= 0.3);
        }
    }

    #[test]
    fn test_glyph_coordinates_include_crop_offset() {
        let mut gray = GrayImage::from_pixel(200, 200, Luma([255]));
        draw_box(&mut gray, Rect::new(120, 130, 20, 20), 0);
        let glyphs = extract_glyphs(
            &gray,
            Rect::new(100, 100, 80, 80),
            &AdaptiveThresholdConfig::default(),
            &GlyphConfig::default(),
        )
        .unwrap();
        assert_eq!(glyphs.len(), 1);
        let glyph = &glyphs[0];
        assert!((117..=123).contains(&glyph.rect.x));
        assert!((127..=133).contains(&glyph.rect.y));

        // The contour is kept in the same frame as the rectangle
        assert!(glyph.contour.len() >= 4);
        assert_eq!(bounding_rect(&glyph.contour), Some(glyph.rect));
    }

    #[test]
    fn test_blank_crop_has_no_glyphs_and_bad_crop_fails() {
        let gray = GrayImage::from_pixel(50, 50, Luma([255]));
        let threshold = AdaptiveThresholdConfig::default();
        let config = GlyphConfig::default();
        assert!(extract_glyphs(&gray, Rect::new(0, 0, 50, 50), &threshold, &config)
            .unwrap()
            .is_empty());

        let result = extract_glyphs(&gray, Rect::new(60, 60, 10, 10), &threshold, &config);
        assert!(matches!(
            result,
            Err(StageError::StageFailure {
                stage: Stage::CharacterExtraction,
                ..
            })
        ));
    }
}
