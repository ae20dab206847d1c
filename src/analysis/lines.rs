//! # Line Grouping
//!
//! Clusters glyphs into text lines by vertical proximity.

use super::types::{CharacterGlyph, Line};
use crate::config::LineGroupingConfig;

/// Group glyphs into lines, top to bottom.
///
/// Glyphs are visited in order of vertical center. A glyph joins the current
/// line when its center is within `proximity_factor` times the line's mean
/// glyph height of the line's last glyph. Every returned line holds at least
/// one glyph.
pub fn group_into_lines(glyphs: &[CharacterGlyph], config: &LineGroupingConfig) -> Vec<Line> {
    let mut sorted: Vec<&CharacterGlyph> = glyphs.iter().collect();
    sorted.sort_by(|a, b| {
        a.center_y
            .total_cmp(&b.center_y)
            .then(a.rect.x.cmp(&b.rect.x))
    });

    let mut lines: Vec<Line> = Vec::new();
    let mut current: Option<Line> = None;
    for glyph in sorted {
        match current.as_mut() {
            Some(line)
                if (glyph.center_y - line.last().center_y).abs()
                    <= config.proximity_factor * line.mean_height() =>
            {
                line.push(glyph.clone());
            }
            _ => {
                if let Some(done) = current.replace(Line::new(glyph.clone())) {
                    lines.push(done);
                }
            }
        }
    }
    lines.extend(current);
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::types::Rect;

    fn glyph(x: u32, y: u32, h: u32) -> CharacterGlyph {
        let rect = Rect::new(x, y, 10, h);
        CharacterGlyph {
            rect,
            angle_degrees: 0.0,
            center_y: rect.center_y() as f64,
            contour_area: 50.0,
            contour: Vec::new(),
        }
    }

    #[test]
    fn test_empty_input() {
        assert!(group_into_lines(&[], &LineGroupingConfig::default()).is_empty());
    }

    #[test]
    fn test_two_lines() {
        let glyphs = vec![
            glyph(30, 52, 20),
            glyph(10, 50, 20),
            glyph(10, 100, 20),
            glyph(20, 48, 20),
            glyph(30, 101, 20),
        ];
        let lines = group_into_lines(&glyphs, &LineGroupingConfig::default());
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].len(), 3);
        assert_eq!(lines[1].len(), 2);
        assert!(lines.iter().all(|line| !line.is_empty()));
    }

    #[test]
    fn test_tolerance_uses_mean_height() {
        // Mean height 20 gives a 10px tolerance; 11px apart starts a new line
        let glyphs = vec![glyph(0, 0, 20), glyph(10, 11, 20)];
        let lines = group_into_lines(&glyphs, &LineGroupingConfig::default());
        assert_eq!(lines.len(), 2);

        let glyphs = vec![glyph(0, 0, 20), glyph(10, 10, 20)];
        let lines = group_into_lines(&glyphs, &LineGroupingConfig::default());
        assert_eq!(lines.len(), 1);
    }
}
