//! # Image Filtering Module
//!
//! Noise suppression for grayscale planes and rectangular-kernel morphology
//! for binary masks.

use image::{GrayImage, Luma};
use imageproc::filter::gaussian_blur_f32;

use super::types::MorphologicalOperation;

/// Gaussian blur; a non-positive sigma returns the input unchanged
pub fn reduce_noise(gray: &GrayImage, sigma: f32) -> GrayImage {
    if sigma <= 0.0 {
        return gray.clone();
    }
    gaussian_blur_f32(gray, sigma)
}

/// Apply opening or closing with a `(width, height)` rectangular kernel.
///
/// The kernel anchor sits at `(width / 2, height / 2)`. Pixels outside the
/// image do not take part in the min/max.
pub fn apply_morphological_operation(
    mask: &GrayImage,
    operation: MorphologicalOperation,
    kernel: (u32, u32),
) -> GrayImage {
    match operation {
        MorphologicalOperation::Opening => dilate(&erode(mask, kernel), kernel),
        MorphologicalOperation::Closing => erode(&dilate(mask, kernel), kernel),
    }
}

/// Rectangular erosion (minimum filter)
pub fn erode(mask: &GrayImage, kernel: (u32, u32)) -> GrayImage {
    rank_filter(mask, kernel, u8::min, u8::MAX)
}

/// Rectangular dilation (maximum filter)
pub fn dilate(mask: &GrayImage, kernel: (u32, u32)) -> GrayImage {
    rank_filter(mask, kernel, u8::max, u8::MIN)
}

/// Separable min/max filter, rows first
fn rank_filter(
    image: &GrayImage,
    (kernel_w, kernel_h): (u32, u32),
    pick: fn(u8, u8) -> u8,
    identity: u8,
) -> GrayImage {
    let (width, height) = image.dimensions();
    let anchor_x = (kernel_w / 2) as i64;
    let anchor_y = (kernel_h / 2) as i64;

    let horizontal = GrayImage::from_fn(width, height, |x, y| {
        let mut acc = identity;
        for i in 0..kernel_w as i64 {
            let sx = x as i64 + i - anchor_x;
            if (0..width as i64).contains(&sx) {
                acc = pick(acc, image.get_pixel(sx as u32, y)[0]);
            }
        }
        Luma([acc])
    });

    GrayImage::from_fn(width, height, |x, y| {
        let mut acc = identity;
        for j in 0..kernel_h as i64 {
            let sy = y as i64 + j - anchor_y;
            if (0..height as i64).contains(&sy) {
                acc = pick(acc, horizontal.get_pixel(x, sy as u32)[0]);
            }
        }
        Luma([acc])
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mask_with(width: u32, height: u32, on: &[(u32, u32)]) -> GrayImage {
        let mut mask = GrayImage::new(width, height);
        for &(x, y) in on {
            mask.put_pixel(x, y, Luma([255]));
        }
        mask
    }

    fn count_on(mask: &GrayImage) -> usize {
        mask.pixels().filter(|p| p[0] > 0).count()
    }

    #[test]
    fn test_opening_removes_isolated_speck() {
        let mut mask = mask_with(20, 20, &[(3, 3)]);
        for y in 10..15 {
            for x in 10..15 {
                mask.put_pixel(x, y, Luma([255]));
            }
        }
        let opened = apply_morphological_operation(&mask, MorphologicalOperation::Opening, (2, 2));
        assert_eq!(opened.get_pixel(3, 3)[0], 0);
        assert_eq!(count_on(&opened), 25);
    }

    #[test]
    fn test_closing_bridges_one_pixel_gap() {
        let mut mask = GrayImage::new(20, 9);
        for x in (2..18).filter(|&x| x != 9) {
            for y in 3..6 {
                mask.put_pixel(x, y, Luma([255]));
            }
        }
        let closed = apply_morphological_operation(&mask, MorphologicalOperation::Closing, (3, 3));
        assert_eq!(closed.get_pixel(9, 4)[0], 255);
    }

    #[test]
    fn test_erode_and_dilate_on_single_pixel() {
        let mask = mask_with(7, 7, &[(3, 3)]);
        assert_eq!(count_on(&erode(&mask, (3, 3))), 0);
        assert_eq!(count_on(&dilate(&mask, (3, 3))), 9);
        // A 1x1 kernel is the identity
        assert_eq!(dilate(&mask, (1, 1)), mask);
    }

    #[test]
    fn test_reduce_noise() {
        let gray = GrayImage::from_fn(16, 16, |x, _| Luma([if x < 8 { 0 } else { 255 }]));
        let blurred = reduce_noise(&gray, 0.8);
        assert_eq!(blurred.dimensions(), (16, 16));
        assert!(blurred.get_pixel(8, 8)[0] < 255);
        assert_eq!(reduce_noise(&gray, 0.0), gray);
    }
}
