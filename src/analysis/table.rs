//! # Item-Table Region Filter
//!
//! Keeps only text regions inside the item-table band of a receipt. Headers
//! (store name, address) and footers (totals, signatures) are often printed
//! even on handwritten receipts, so they are excluded before scoring.

use super::types::{TableRegion, TextRegion};
use crate::config::TableFilterConfig;

/// Pixel bounds of the table band; regions must lie strictly inside
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableBand {
    pub top: u32,
    pub bottom: u32,
    pub left: u32,
    pub right: u32,
}

impl TableBand {
    pub fn for_image(width: u32, height: u32, config: &TableFilterConfig) -> Self {
        let margin = (width as f64 * config.side_margin_fraction) as u32;
        Self {
            top: (height as f64 * config.header_fraction) as u32,
            bottom: (height as f64 * (1.0 - config.footer_fraction)) as u32,
            left: margin,
            right: width.saturating_sub(margin),
        }
    }
}

/// Select the regions that belong to the item table, ordered top to bottom.
///
/// A region is kept when it lies strictly inside the [`TableBand`], is
/// strictly larger than `min_width` x `min_height`, and is strictly smaller
/// than the maximum fractions of the image.
pub fn filter_table_regions(
    regions: &[TextRegion],
    image_width: u32,
    image_height: u32,
    config: &TableFilterConfig,
) -> Vec<TableRegion> {
    let band = TableBand::for_image(image_width, image_height, config);
    let max_w = image_width as f64 * config.max_width_fraction;
    let max_h = image_height as f64 * config.max_height_fraction;

    let mut table: Vec<TableRegion> = regions
        .iter()
        .map(TextRegion::rect)
        .filter(|r| r.y > band.top && r.bottom() < band.bottom)
        .filter(|r| r.x > band.left && r.right() < band.right)
        .filter(|r| r.w > config.min_width && r.h > config.min_height)
        .filter(|r| (r.w as f64) < max_w && (r.h as f64) < max_h)
        .map(TableRegion::new)
        .collect();
    table.sort_by_key(|t| (t.rect().y, t.rect().x));
    table
}
