//! # Shared Types for Receipt Analysis
//!
//! Geometry, per-stage outputs and the final routing decision. Every value
//! lives within a single pipeline invocation.

use imageproc::point::Point;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Axis-aligned rectangle in pixel coordinates of its parent image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl Rect {
    pub const fn new(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }

    /// Exclusive right edge
    pub fn right(&self) -> u32 {
        self.x + self.w
    }

    /// Exclusive bottom edge
    pub fn bottom(&self) -> u32 {
        self.y + self.h
    }

    pub fn area(&self) -> u64 {
        self.w as u64 * self.h as u64
    }

    pub fn is_empty(&self) -> bool {
        self.w == 0 || self.h == 0
    }

    /// Integer vertical center, `y + h / 2`
    pub fn center_y(&self) -> u32 {
        self.y + self.h / 2
    }

    /// Width over height
    pub fn aspect_ratio(&self) -> f64 {
        self.w as f64 / self.h as f64
    }

    /// Smallest rectangle containing both
    pub fn union(&self, other: &Rect) -> Rect {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        Rect {
            x,
            y,
            w: self.right().max(other.right()) - x,
            h: self.bottom().max(other.bottom()) - y,
        }
    }

    /// Intersection with a `width` x `height` parent, `None` if nothing remains
    pub fn clamp_to(&self, width: u32, height: u32) -> Option<Rect> {
        let right = self.right().min(width);
        let bottom = self.bottom().min(height);
        if self.x >= right || self.y >= bottom {
            return None;
        }
        Some(Rect {
            x: self.x,
            y: self.y,
            w: right - self.x,
            h: bottom - self.y,
        })
    }

    /// Same rectangle shifted by an offset
    pub fn translate(&self, dx: u32, dy: u32) -> Rect {
        Rect {
            x: self.x + dx,
            y: self.y + dy,
            ..*self
        }
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}+{}+{}", self.w, self.h, self.x, self.y)
    }
}

/// A row-like area likely to contain text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TextRegion(pub Rect);

impl TextRegion {
    pub fn rect(&self) -> Rect {
        self.0
    }
}

/// A text region that survived the item-table filter.
///
/// Only [`crate::analysis::table::filter_table_regions`] creates these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TableRegion(Rect);

impl TableRegion {
    pub(crate) fn new(rect: Rect) -> Self {
        Self(rect)
    }

    pub fn rect(&self) -> Rect {
        self.0
    }
}

/// A single extracted character candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterGlyph {
    /// Bounding rectangle in full-image coordinates
    pub rect: Rect,
    /// Orientation from the contour's second moments, in [-90, 90]
    pub angle_degrees: f64,
    /// Integer vertical center of the bounding rectangle
    pub center_y: f64,
    /// Enclosed contour area in square pixels
    pub contour_area: f64,
    /// Outer contour in full-image coordinates; not part of serialized reports
    #[serde(skip)]
    pub contour: Vec<Point<i32>>,
}

impl CharacterGlyph {
    pub fn height(&self) -> f64 {
        self.rect.h as f64
    }
}

/// Glyphs sharing a baseline. Never empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Line {
    glyphs: Vec<CharacterGlyph>,
}

impl Line {
    pub fn new(first: CharacterGlyph) -> Self {
        Self {
            glyphs: vec![first],
        }
    }

    pub fn push(&mut self, glyph: CharacterGlyph) {
        self.glyphs.push(glyph);
    }

    pub fn glyphs(&self) -> &[CharacterGlyph] {
        &self.glyphs
    }

    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    /// Always false; kept for the `len` convention
    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }

    /// Most recently added glyph
    pub fn last(&self) -> &CharacterGlyph {
        // Non-empty by construction
        &self.glyphs[self.glyphs.len() - 1]
    }

    pub fn mean_height(&self) -> f64 {
        self.glyphs.iter().map(CharacterGlyph::height).sum::<f64>() / self.glyphs.len() as f64
    }
}

/// Irregularity of one line of glyphs
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ChaosMetrics {
    pub height_chaos: f64,
    pub angle_chaos: f64,
    pub center_y_chaos: f64,
    pub width_chaos: f64,
    pub spacing_chaos: f64,
    pub aspect_chaos: f64,
    pub y_roughness: f64,
    pub angle_roughness: f64,
    /// Weighted, rescaled combination in [0, 1]
    pub chaos_index: f64,
}

/// Per-receipt aggregate of line chaos
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ChaosSummary {
    pub line_count: usize,
    pub mean_chaos: f64,
    pub max_chaos: f64,
    /// Fraction of lines above the chaotic-line threshold
    pub chaotic_line_ratio: f64,
}

/// Texture measurements of one table region
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BlockMetrics {
    /// Foreground ratio after adaptive thresholding
    pub density: f64,
    /// Coefficient of variation of intensity
    pub contrast: f64,
    /// Edge-pixel ratio
    pub edge_density: f64,
}

/// Share of blocks exceeding each soft threshold
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BlockVoteRatios {
    pub density_ratio: f64,
    pub contrast_ratio: f64,
    pub edge_ratio: f64,
    pub block_count: usize,
}

/// Downstream OCR backend selected for a receipt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutingModel {
    /// Cheaper model for machine-printed tables
    PrintedModel,
    /// More capable model for handwritten tables and the safe fallback
    HandwrittenModel,
}

impl RoutingModel {
    /// Short label used in logs and metrics
    pub fn label(&self) -> &'static str {
        match self {
            RoutingModel::PrintedModel => "printed",
            RoutingModel::HandwrittenModel => "handwritten",
        }
    }
}

impl fmt::Display for RoutingModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Final routing decision
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelDecision {
    pub decision: RoutingModel,
    /// Aggregate evidence for handwriting in [0, 1]
    pub handwritten_score: f64,
    /// Threshold the score was compared against
    pub threshold: f64,
}

impl ModelDecision {
    /// Decision used whenever the pipeline could not finish.
    ///
    /// The score is pinned to 1.0 so that `score > threshold` still agrees
    /// with the handwritten decision.
    pub fn fallback(threshold: f64) -> Self {
        Self {
            decision: RoutingModel::HandwrittenModel,
            handwritten_score: 1.0,
            threshold,
        }
    }

    /// Zero-evidence decision used when no table region survives
    pub fn no_evidence(threshold: f64) -> Self {
        Self {
            decision: RoutingModel::PrintedModel,
            handwritten_score: 0.0,
            threshold,
        }
    }
}
