//! # Chaos Index
//!
//! Quantifies how irregular a line of glyphs is. Printed text has uniform
//! glyph heights, a shared baseline and upright strokes; handwriting varies
//! in all three. Width, spacing, aspect and roughness terms are available for
//! presets that weigh them.

use super::types::{ChaosMetrics, ChaosSummary, Line};
use crate::config::ChaosWeights;

/// Chaos metrics of one line; lines with fewer than two glyphs score zero
pub fn compute_chaos(line: &Line, weights: &ChaosWeights) -> ChaosMetrics {
    if line.len() < 2 {
        return ChaosMetrics::default();
    }

    let glyphs = line.glyphs();
    let heights: Vec<f64> = glyphs.iter().map(|g| g.height()).collect();
    let widths: Vec<f64> = glyphs.iter().map(|g| g.rect.w as f64).collect();
    let centers: Vec<f64> = glyphs.iter().map(|g| g.center_y).collect();
    let angles: Vec<f64> = glyphs
        .iter()
        .map(|g| {
            if weights.absolute_angles {
                g.angle_degrees.abs()
            } else {
                g.angle_degrees
            }
        })
        .collect();

    let mean_height = mean(&heights);
    if mean_height <= 0.0 {
        return ChaosMetrics::default();
    }

    let height_chaos = std_dev(&heights) / mean_height;
    let width_chaos = coefficient_of_variation(&widths);

    let angle_variance = variance(&angles);
    let angle_std = angle_variance.sqrt();
    let mut angle_chaos = (angle_std / weights.angle_normalizer_degrees).min(1.0);
    if angle_variance < weights.printed_angle_variance {
        angle_chaos *= weights.printed_angle_damping;
    }
    let angle_roughness = (angle_variance / weights.angle_roughness_variance).min(1.0);

    let center_y_chaos = std_dev(&centers) / mean_height;
    let y_roughness = (variance(&centers) / (mean_height * mean_height)).min(1.0);

    let aspects: Vec<f64> = glyphs
        .iter()
        .filter(|g| g.rect.h > 0)
        .map(|g| g.rect.aspect_ratio())
        .collect();
    let aspect_chaos = coefficient_of_variation(&aspects);
    let spacing_chaos = coefficient_of_variation(&horizontal_gaps(line));

    let combined = weights.height * height_chaos
        + weights.width * width_chaos
        + weights.angle * angle_chaos
        + weights.center_y * center_y_chaos
        + weights.spacing * spacing_chaos
        + weights.aspect * aspect_chaos
        + weights.y_roughness * y_roughness
        + weights.angle_roughness * angle_roughness;

    ChaosMetrics {
        height_chaos,
        angle_chaos,
        center_y_chaos,
        width_chaos,
        spacing_chaos,
        aspect_chaos,
        y_roughness,
        angle_roughness,
        chaos_index: rescale(combined, weights),
    }
}

/// Absolute gaps between consecutive glyphs, left to right
fn horizontal_gaps(line: &Line) -> Vec<f64> {
    let mut rects: Vec<_> = line.glyphs().iter().map(|g| g.rect).collect();
    rects.sort_by_key(|r| (r.x, r.y));
    rects
        .windows(2)
        .map(|pair| (pair[1].x as f64 - pair[0].right() as f64).abs())
        .collect()
}

/// Piecewise rescale that suppresses the low range and stretches the high one
pub fn rescale(value: f64, weights: &ChaosWeights) -> f64 {
    let rescaled = if value < weights.low_breakpoint {
        value * weights.low_factor
    } else if value > weights.high_breakpoint {
        weights.high_base + (value - weights.high_breakpoint) * weights.high_slope
    } else {
        value
    };
    rescaled.clamp(0.0, 1.0)
}

/// Aggregate per-line chaos into a receipt-level summary
pub fn summarize_chaos(metrics: &[ChaosMetrics], weights: &ChaosWeights) -> ChaosSummary {
    if metrics.is_empty() {
        return ChaosSummary::default();
    }
    let indices: Vec<f64> = metrics.iter().map(|m| m.chaos_index).collect();
    let chaotic = indices
        .iter()
        .filter(|&&c| c > weights.chaotic_line_threshold)
        .count();
    ChaosSummary {
        line_count: indices.len(),
        mean_chaos: mean(&indices),
        max_chaos: indices.iter().copied().fold(0.0, f64::max),
        chaotic_line_ratio: chaotic as f64 / indices.len() as f64,
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population variance
fn variance(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64
}

/// Population standard deviation
fn std_dev(values: &[f64]) -> f64 {
    variance(values).sqrt()
}

/// Standard deviation over mean; 0.0 when the mean is not positive
fn coefficient_of_variation(values: &[f64]) -> f64 {
    let m = mean(values);
    if m <= 0.0 {
        return 0.0;
    }
    std_dev(values) / m
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::types::{CharacterGlyph, Rect};

    fn glyph(x: u32, y: u32, h: u32, angle: f64) -> CharacterGlyph {
        let rect = Rect::new(x, y, 10, h);
        CharacterGlyph {
            rect,
            angle_degrees: angle,
            center_y: rect.center_y() as f64,
            contour_area: 60.0,
            contour: Vec::new(),
        }
    }

    fn line_of(glyphs: Vec<CharacterGlyph>) -> Line {
        let mut iter = glyphs.into_iter();
        let mut line = Line::new(iter.next().unwrap());
        for g in iter {
            line.push(g);
        }
        line
    }

    #[test]
    fn test_single_glyph_line_is_zero() {
        let line = Line::new(glyph(0, 0, 30, 40.0));
        assert_eq!(compute_chaos(&line, &ChaosWeights::default()), ChaosMetrics::default());
    }

    #[test]
    fn test_uniform_line_is_zero() {
        let line = line_of((0..6).map(|i| glyph(i * 15, 40, 20, 0.0)).collect());
        let metrics = compute_chaos(&line, &ChaosWeights::default());
        assert_eq!(metrics.chaos_index, 0.0);
        assert_eq!(metrics.height_chaos, 0.0);
    }

    #[test]
    fn test_irregular_line_scores_high_and_stays_bounded() {
        let line = line_of(vec![
            glyph(0, 30, 12, -35.0),
            glyph(15, 44, 30, 40.0),
            glyph(30, 25, 18, -20.0),
            glyph(45, 50, 40, 30.0),
        ]);
        let metrics = compute_chaos(&line, &ChaosWeights::default());
        assert_eq!(metrics.angle_chaos, 1.0);
        assert!(metrics.chaos_index > 0.5);
        assert!(metrics.chaos_index <= 1.0);
    }

    #[test]
    fn test_small_angle_variance_is_damped() {
        // Angles +-2 degrees: std 2, variance 4 < 25
        let line = line_of(vec![glyph(0, 0, 20, -2.0), glyph(15, 0, 20, 2.0)]);
        let metrics = compute_chaos(&line, &ChaosWeights::default());
        assert!((metrics.angle_chaos - (2.0 / 15.0) * 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_improved_chaos_components() {
        // Equal heights and baselines; widths 10/10/20, gaps 5/10, angles -10/10/0
        let mut wide = glyph(35, 40, 20, 0.0);
        wide.rect.w = 20;
        let line = line_of(vec![glyph(15, 40, 20, 10.0), wide, glyph(0, 40, 20, -10.0)]);
        let weights = crate::config::ScoringWeights::improved_chaos().chaos;
        let metrics = compute_chaos(&line, &weights);

        let sqrt2 = 2.0_f64.sqrt();
        assert_eq!(metrics.height_chaos, 0.0);
        assert_eq!(metrics.center_y_chaos, 0.0);
        assert_eq!(metrics.y_roughness, 0.0);
        assert!((metrics.width_chaos - sqrt2 / 4.0).abs() < 1e-12);
        assert!((metrics.aspect_chaos - sqrt2 / 4.0).abs() < 1e-12);
        assert!((metrics.spacing_chaos - 1.0 / 3.0).abs() < 1e-12);
        // |angles| are 10/10/0: variance 200/9, no damping
        assert!((metrics.angle_chaos - sqrt2 / 3.0).abs() < 1e-12);
        assert!((metrics.angle_roughness - 2.0 / 9.0).abs() < 1e-12);

        let combined = 0.10 * sqrt2 / 4.0
            + 0.25 * sqrt2 / 3.0
            + 0.10 / 3.0
            + 0.10 * sqrt2 / 4.0
            + 0.05 * 2.0 / 9.0;
        // Below the 0.3 breakpoint the sum is scaled by 0.7
        assert!((metrics.chaos_index - 0.7 * combined).abs() < 1e-12);
        assert!((metrics.chaos_index - 0.163104).abs() < 1e-6);
    }

    #[test]
    fn test_baseline_ignores_shape_components() {
        let mut wide = glyph(35, 40, 20, 0.0);
        wide.rect.w = 20;
        let line = line_of(vec![glyph(0, 40, 20, 0.0), glyph(15, 40, 20, 0.0), wide]);
        let metrics = compute_chaos(&line, &ChaosWeights::default());
        assert!(metrics.width_chaos > 0.0);
        assert!(metrics.spacing_chaos > 0.0);
        assert_eq!(metrics.chaos_index, 0.0);
    }

    #[test]
    fn test_rescale_curve() {
        let weights = ChaosWeights::default();
        assert!((rescale(0.1, &weights) - 0.05).abs() < 1e-12);
        assert_eq!(rescale(0.4, &weights), 0.4);
        assert!((rescale(0.8, &weights) - 0.75).abs() < 1e-12);
        assert_eq!(rescale(5.0, &weights), 1.0);

        let improved = crate::config::ScoringWeights::improved_chaos().chaos;
        assert!((rescale(0.8, &improved) - 0.9).abs() < 1e-12);
    }

    #[test]
    fn test_summary() {
        let weights = ChaosWeights::default();
        let metrics = [0.1, 0.7, 0.4, 0.9].map(|chaos_index| ChaosMetrics {
            chaos_index,
            ..ChaosMetrics::default()
        });
        let summary = summarize_chaos(&metrics, &weights);
        assert_eq!(summary.line_count, 4);
        assert!((summary.mean_chaos - 0.525).abs() < 1e-12);
        assert_eq!(summary.max_chaos, 0.9);
        assert_eq!(summary.chaotic_line_ratio, 0.5);

        assert_eq!(summarize_chaos(&[], &weights), ChaosSummary::default());
    }
}
