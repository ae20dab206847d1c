//! # Text Region Detection
//!
//! Proposes text-like areas with a stable-extremal-region detector and merges
//! the proposals into row-shaped [`TextRegion`]s.
//!
//! Dark-on-light blobs are found by thresholding the blurred grayscale plane
//! at a ladder of intensity levels. A connected component is a proposal when
//! its area barely grows as the threshold moves to the next level, which is
//! what ink on paper looks like and what gradients and shadows do not.

use image::{GrayImage, Luma};
use imageproc::region_labelling::{connected_components, Connectivity};
use std::collections::BTreeSet;
use tracing;

use super::types::{Rect, TextRegion};
use crate::config::RegionConfig;
use crate::preprocessing::filtering::reduce_noise;

/// Threshold ladder for a given step: `step, 2*step, ...` strictly below 255
pub fn intensity_levels(step: u8) -> Vec<u8> {
    let step = step.max(1) as u16;
    (1..)
        .map(|i| i * step)
        .take_while(|&level| level < 255)
        .map(|level| level as u8)
        .collect()
}

/// Detect text regions in a grayscale image.
///
/// Zero regions is a valid outcome (blank or textless images). Images
/// narrower or shorter than `min_side` cannot hold a candidate and yield none.
pub fn detect_text_regions(gray: &GrayImage, config: &RegionConfig, levels: &[u8]) -> Vec<TextRegion> {
    if gray.width() < config.min_side || gray.height() < config.min_side {
        tracing::debug!(
            target: "receipt_analysis",
            width = gray.width(),
            height = gray.height(),
            min_side = config.min_side,
            "Image smaller than a text candidate, skipping region detection"
        );
        return Vec::new();
    }

    let start_time = std::time::Instant::now();
    let blurred = reduce_noise(gray, config.blur_sigma);

    let proposals = stable_region_proposals(&blurred, config, levels);
    let candidates: Vec<Rect> = proposals
        .into_iter()
        .filter(|rect| passes_geometry_filters(rect, config))
        .collect();
    let regions = merge_into_rows(candidates, config.line_merge_factor);

    tracing::debug!(
        target: "receipt_analysis",
        regions = regions.len(),
        levels = levels.len(),
        "Region detection completed in {}ms",
        start_time.elapsed().as_millis()
    );
    regions
}

#[derive(Debug, Clone, Copy)]
struct ComponentStats {
    area: u32,
    min_x: u32,
    min_y: u32,
    max_x: u32,
    max_y: u32,
    /// First pixel in raster order, used to find the component at the next level
    seed: (u32, u32),
}

impl ComponentStats {
    fn start(x: u32, y: u32) -> Self {
        Self {
            area: 0,
            min_x: x,
            min_y: y,
            max_x: x,
            max_y: y,
            seed: (x, y),
        }
    }

    fn add(&mut self, x: u32, y: u32) {
        self.area += 1;
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
    }

    fn bounding_rect(&self) -> Rect {
        Rect::new(
            self.min_x,
            self.min_y,
            self.max_x - self.min_x + 1,
            self.max_y - self.min_y + 1,
        )
    }
}

struct LevelComponents {
    labels: image::ImageBuffer<Luma<u32>, Vec<u32>>,
    /// Indexed by label; label 0 is background
    stats: Vec<Option<ComponentStats>>,
}

fn label_level(blurred: &GrayImage, level: u8) -> LevelComponents {
    let mask = GrayImage::from_fn(blurred.width(), blurred.height(), |x, y| {
        Luma([if blurred.get_pixel(x, y)[0] <= level { 255 } else { 0 }])
    });
    let labels = connected_components(&mask, Connectivity::Eight, Luma([0u8]));

    let mut stats: Vec<Option<ComponentStats>> = Vec::new();
    for (x, y, label) in labels.enumerate_pixels() {
        let label = label[0] as usize;
        if label == 0 {
            continue;
        }
        if label >= stats.len() {
            stats.resize(label + 1, None);
        }
        stats[label]
            .get_or_insert_with(|| ComponentStats::start(x, y))
            .add(x, y);
    }
    LevelComponents { labels, stats }
}

/// Bounding boxes of components that stay stable between consecutive levels
fn stable_region_proposals(blurred: &GrayImage, config: &RegionConfig, levels: &[u8]) -> Vec<Rect> {
    let mut proposals = BTreeSet::new();
    let mut previous: Option<LevelComponents> = None;

    for &level in levels {
        let current = label_level(blurred, level);
        if let Some(prev) = &previous {
            for stats in prev.stats.iter().flatten() {
                if stats.area < config.min_blob_area || stats.area > config.max_blob_area {
                    continue;
                }
                // Masks are nested, so the seed is foreground at the next level too
                let (sx, sy) = stats.seed;
                let next_label = current.labels.get_pixel(sx, sy)[0] as usize;
                let Some(next) = current.stats.get(next_label).copied().flatten() else {
                    continue;
                };
                let variation = next.area.saturating_sub(stats.area) as f32 / stats.area as f32;
                if variation <= config.max_variation {
                    proposals.insert(stats.bounding_rect());
                }
            }
        }
        previous = Some(current);
    }

    proposals.into_iter().collect()
}

/// Side, aspect and area bounds for a single candidate
pub fn passes_geometry_filters(rect: &Rect, config: &RegionConfig) -> bool {
    let side_ok = |side: u32| (config.min_side..=config.max_side).contains(&side);
    if !side_ok(rect.w) || !side_ok(rect.h) {
        return false;
    }
    let aspect = rect.aspect_ratio() as f32;
    if aspect < config.min_aspect || aspect > config.max_aspect {
        return false;
    }
    let area = rect.area();
    area >= config.min_area as u64 && area <= config.max_area as u64
}

/// Merge candidate boxes into row-like regions.
///
/// Candidates are visited top to bottom. A candidate joins the current row
/// while its vertical center is within `factor * max(h_last, h_candidate)` of
/// the row's last member; otherwise the row is closed as the bounding union
/// of its members.
pub fn merge_into_rows(mut candidates: Vec<Rect>, factor: f32) -> Vec<TextRegion> {
    candidates.sort_by_key(|r| (r.y, r.x, r.w, r.h));

    let mut regions = Vec::new();
    let mut iter = candidates.into_iter();
    let Some(first) = iter.next() else {
        return regions;
    };

    let mut row_bounds = first;
    let mut last = first;
    for candidate in iter {
        let distance = (candidate.center_y() as i64 - last.center_y() as i64).unsigned_abs();
        let tolerance = factor as f64 * last.h.max(candidate.h) as f64;
        if distance as f64 <= tolerance {
            row_bounds = row_bounds.union(&candidate);
        } else {
            regions.push(TextRegion(row_bounds));
            row_bounds = candidate;
        }
        last = candidate;
    }
    regions.push(TextRegion(row_bounds));
    regions
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draw_box(image: &mut GrayImage, rect: Rect, value: u8) {
        for y in rect.y..rect.bottom() {
            for x in rect.x..rect.right() {
                image.put_pixel(x, y, Luma([value]));
            }
        }
    }

    #[test]
    fn test_intensity_levels() {
        let levels = intensity_levels(16);
        assert_eq!(levels.first(), Some(&16));
        assert_eq!(levels.last(), Some(&240));
        assert_eq!(levels.len(), 15);
        assert_eq!(intensity_levels(200), vec![200]);
    }

    #[test]
    fn test_blank_image_has_no_regions() {
        let gray = GrayImage::from_pixel(200, 300, Luma([255]));
        let config = RegionConfig::default();
        let regions = detect_text_regions(&gray, &config, &intensity_levels(config.intensity_step));
        assert!(regions.is_empty());
    }

    #[test]
    fn test_images_below_min_side_have_no_regions() {
        let config = RegionConfig::default();
        let levels = intensity_levels(config.intensity_step);
        for (width, height) in [(1, 1), (1, 40), (40, 2), (4, 4)] {
            let gray = GrayImage::from_pixel(width, height, Luma([0]));
            assert!(
                detect_text_regions(&gray, &config, &levels).is_empty(),
                "{}x{}",
                width,
                height
            );
        }
    }

    #[test]
    fn test_dark_blobs_become_row_regions() {
        let mut gray = GrayImage::from_pixel(300, 200, Luma([255]));
        // Two rows of three 12x16 dark boxes
        for (i, x) in [40u32, 70, 100].iter().enumerate() {
            draw_box(&mut gray, Rect::new(*x, 50 + i as u32, 12, 16), 20);
            draw_box(&mut gray, Rect::new(*x, 130, 12, 16), 20);
        }
        let config = RegionConfig::default();
        let regions = detect_text_regions(&gray, &config, &intensity_levels(config.intensity_step));
        assert_eq!(regions.len(), 2, "regions: {:?}", regions);
        assert!(regions[0].rect().y < 60);
        assert!(regions[1].rect().y >= 120);
        assert!(regions[0].rect().w >= 70);
    }

    #[test]
    fn test_geometry_filters() {
        let config = RegionConfig::default();
        assert!(passes_geometry_filters(&Rect::new(0, 0, 10, 20), &config));
        assert!(!passes_geometry_filters(&Rect::new(0, 0, 4, 20), &config));
        assert!(!passes_geometry_filters(&Rect::new(0, 0, 201, 20), &config));
        // 100x12 passes, 150x150 fails the area bound
        assert!(passes_geometry_filters(&Rect::new(0, 0, 100, 12), &config));
        assert!(!passes_geometry_filters(&Rect::new(0, 0, 150, 150), &config));
        // 5x60 has an aspect below 0.1
        assert!(!passes_geometry_filters(&Rect::new(0, 0, 5, 60), &config));
    }

    #[test]
    fn test_merge_into_rows() {
        let candidates = vec![
            Rect::new(50, 102, 10, 10),
            Rect::new(10, 100, 10, 10),
            Rect::new(30, 101, 10, 12),
            Rect::new(10, 140, 10, 10),
        ];
        let rows = merge_into_rows(candidates, 0.5);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].rect(), Rect::new(10, 100, 50, 13));
        assert_eq!(rows[1].rect(), Rect::new(10, 140, 10, 10));
        assert!(merge_into_rows(Vec::new(), 0.5).is_empty());
    }
}
