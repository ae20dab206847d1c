//! # Unified Classifier Configuration
//!
//! This module consolidates every tunable of the classification pipeline into a
//! single, structured configuration object. All values default to the
//! empirically tuned constants of the production classifier and can be
//! overridden from environment variables or constructed directly.
//!
//! Scoring constants are grouped in [`ScoringWeights`], which also provides the
//! named presets used for offline tuning and evaluation.

use crate::errors::{ClassifierError, ClassifierResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

/// Image normalization settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizerConfig {
    /// Images wider than this are downscaled (aspect ratio preserved)
    pub max_working_width: u32,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            max_working_width: 1000,
        }
    }
}

impl NormalizerConfig {
    /// Validate normalizer configuration
    pub fn validate(&self) -> ClassifierResult<()> {
        if self.max_working_width < 32 {
            return Err(ClassifierError::Config(format!(
                "max_working_width must be at least 32 pixels, got {}",
                self.max_working_width
            )));
        }
        if self.max_working_width > 10_000 {
            return Err(ClassifierError::Config(
                "max_working_width cannot be greater than 10000 pixels".to_string(),
            ));
        }
        Ok(())
    }
}

/// Skew estimation and correction settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkewConfig {
    /// Gaussian sigma applied before edge detection (a 5x5 kernel equivalent)
    pub blur_sigma: f32,
    /// Canny hysteresis thresholds
    pub canny_low: f32,
    pub canny_high: f32,
    /// Minimum Hough accumulator votes for a line to count
    pub vote_threshold: u32,
    /// Non-maximum suppression radius in the Hough accumulator
    pub suppression_radius: u32,
    /// Skew below this magnitude (degrees) is left uncorrected
    pub min_correction_degrees: f32,
}

impl Default for SkewConfig {
    fn default() -> Self {
        Self {
            blur_sigma: 1.1,
            canny_low: 50.0,
            canny_high: 150.0,
            vote_threshold: 100,
            suppression_radius: 2,
            min_correction_degrees: 1.0,
        }
    }
}

impl SkewConfig {
    /// Validate skew configuration
    pub fn validate(&self) -> ClassifierResult<()> {
        if self.blur_sigma <= 0.0 {
            return Err(ClassifierError::Config(
                "skew blur_sigma must be greater than 0".to_string(),
            ));
        }
        if self.canny_low < 0.0 || self.canny_high < self.canny_low {
            return Err(ClassifierError::Config(format!(
                "skew canny thresholds are invalid: low={}, high={}",
                self.canny_low, self.canny_high
            )));
        }
        if self.vote_threshold == 0 {
            return Err(ClassifierError::Config(
                "skew vote_threshold must be greater than 0".to_string(),
            ));
        }
        if !(0.0..45.0).contains(&self.min_correction_degrees) {
            return Err(ClassifierError::Config(
                "min_correction_degrees must be within [0, 45)".to_string(),
            ));
        }
        Ok(())
    }
}

/// Blob proposal and row merging settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionConfig {
    /// Gaussian sigma applied before blob detection (a 3x3 kernel equivalent)
    pub blur_sigma: f32,
    /// Distance between consecutive intensity levels of the threshold ladder
    pub intensity_step: u8,
    /// Connected-component area bounds for a blob to be considered at all
    pub min_blob_area: u32,
    pub max_blob_area: u32,
    /// Maximum relative area growth to the next level for a blob to be stable
    pub max_variation: f32,
    /// Candidate side bounds in pixels
    pub min_side: u32,
    pub max_side: u32,
    /// Candidate width/height bounds
    pub min_aspect: f32,
    pub max_aspect: f32,
    /// Candidate bounding box area bounds in square pixels
    pub min_area: u32,
    pub max_area: u32,
    /// Vertical merge tolerance as a fraction of the taller candidate
    pub line_merge_factor: f32,
}

impl Default for RegionConfig {
    fn default() -> Self {
        Self {
            blur_sigma: 0.8,
            intensity_step: 16,
            min_blob_area: 20,
            max_blob_area: 10_000,
            max_variation: 0.25,
            min_side: 5,
            max_side: 200,
            min_aspect: 0.1,
            max_aspect: 10.0,
            min_area: 25,
            max_area: 20_000,
            line_merge_factor: 0.5,
        }
    }
}

impl RegionConfig {
    /// Validate region detection configuration
    pub fn validate(&self) -> ClassifierResult<()> {
        if self.blur_sigma <= 0.0 {
            return Err(ClassifierError::Config(
                "region blur_sigma must be greater than 0".to_string(),
            ));
        }
        if self.intensity_step == 0 {
            return Err(ClassifierError::Config(
                "intensity_step must be greater than 0".to_string(),
            ));
        }
        if self.min_blob_area > self.max_blob_area {
            return Err(ClassifierError::Config(
                "min_blob_area cannot be greater than max_blob_area".to_string(),
            ));
        }
        if self.max_variation <= 0.0 {
            return Err(ClassifierError::Config(
                "max_variation must be greater than 0".to_string(),
            ));
        }
        if self.min_side > self.max_side {
            return Err(ClassifierError::Config(
                "region min_side cannot be greater than max_side".to_string(),
            ));
        }
        if self.min_aspect <= 0.0 || self.min_aspect > self.max_aspect {
            return Err(ClassifierError::Config(format!(
                "region aspect bounds are invalid: min={}, max={}",
                self.min_aspect, self.max_aspect
            )));
        }
        if self.min_area > self.max_area {
            return Err(ClassifierError::Config(
                "region min_area cannot be greater than max_area".to_string(),
            ));
        }
        if self.line_merge_factor < 0.0 {
            return Err(ClassifierError::Config(
                "line_merge_factor cannot be negative".to_string(),
            ));
        }
        Ok(())
    }
}

/// Item-table band selection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableFilterConfig {
    /// Top fraction of the image treated as header
    pub header_fraction: f64,
    /// Bottom fraction of the image treated as footer
    pub footer_fraction: f64,
    /// Fraction of the width excluded on each side
    pub side_margin_fraction: f64,
    /// Regions must be strictly larger than this
    pub min_width: u32,
    pub min_height: u32,
    /// Regions must be strictly smaller than these fractions of the image
    pub max_width_fraction: f64,
    pub max_height_fraction: f64,
}

impl Default for TableFilterConfig {
    fn default() -> Self {
        Self {
            header_fraction: 0.20,
            footer_fraction: 0.15,
            side_margin_fraction: 0.05,
            min_width: 20,
            min_height: 10,
            max_width_fraction: 0.8,
            max_height_fraction: 0.3,
        }
    }
}

impl TableFilterConfig {
    /// Validate table filter configuration
    pub fn validate(&self) -> ClassifierResult<()> {
        for (name, value) in [
            ("header_fraction", self.header_fraction),
            ("footer_fraction", self.footer_fraction),
            ("side_margin_fraction", self.side_margin_fraction),
            ("max_width_fraction", self.max_width_fraction),
            ("max_height_fraction", self.max_height_fraction),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ClassifierError::Config(format!(
                    "{} must be within [0, 1], got {}",
                    name, value
                )));
            }
        }
        if self.header_fraction + self.footer_fraction >= 1.0 {
            return Err(ClassifierError::Config(
                "header_fraction + footer_fraction must leave room for the table".to_string(),
            ));
        }
        if self.side_margin_fraction >= 0.5 {
            return Err(ClassifierError::Config(
                "side_margin_fraction must be below 0.5".to_string(),
            ));
        }
        Ok(())
    }
}

/// Locally-normalized binarization settings shared by glyph and block analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdaptiveThresholdConfig {
    /// Odd neighbourhood size used to compute the local Gaussian mean
    pub block_size: u32,
    /// Constant subtracted from the local mean
    pub offset: f32,
}

impl Default for AdaptiveThresholdConfig {
    fn default() -> Self {
        Self {
            block_size: 11,
            offset: 2.0,
        }
    }
}

impl AdaptiveThresholdConfig {
    /// Gaussian sigma matching the block size (OpenCV's kernel-size rule)
    pub fn sigma(&self) -> f32 {
        0.3 * ((self.block_size as f32 - 1.0) * 0.5 - 1.0) + 0.8
    }

    /// Validate adaptive threshold configuration
    pub fn validate(&self) -> ClassifierResult<()> {
        if self.block_size < 3 || self.block_size % 2 == 0 {
            return Err(ClassifierError::Config(format!(
                "adaptive threshold block_size must be odd and >= 3, got {}",
                self.block_size
            )));
        }
        Ok(())
    }
}

/// Glyph extraction filters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlyphConfig {
    /// Rectangular kernel (width, height) for speckle removal
    pub open_kernel: (u32, u32),
    /// Rectangular kernel (width, height) for stroke reconnection
    pub close_kernel: (u32, u32),
    pub min_side: u32,
    pub max_side: u32,
    pub min_aspect: f32,
    pub max_aspect: f32,
    /// Contour area bounds in square pixels
    pub min_contour_area: f64,
    pub max_contour_area: f64,
    /// Minimum contour area / bounding rect area
    pub min_compactness: f64,
    /// Fewer contour points than this leave the orientation at 0
    pub min_ellipse_points: usize,
}

impl Default for GlyphConfig {
    fn default() -> Self {
        Self {
            open_kernel: (2, 2),
            close_kernel: (3, 3),
            min_side: 8,
            max_side: 80,
            min_aspect: 0.2,
            max_aspect: 5.0,
            min_contour_area: 50.0,
            max_contour_area: 2000.0,
            min_compactness: 0.3,
            min_ellipse_points: 5,
        }
    }
}

impl GlyphConfig {
    /// Validate glyph extraction configuration
    pub fn validate(&self) -> ClassifierResult<()> {
        let kernels = [self.open_kernel, self.close_kernel];
        if kernels.iter().any(|&(w, h)| w == 0 || h == 0) {
            return Err(ClassifierError::Config(
                "morphology kernels must be at least 1x1".to_string(),
            ));
        }
        if self.min_side > self.max_side {
            return Err(ClassifierError::Config(
                "glyph min_side cannot be greater than max_side".to_string(),
            ));
        }
        if self.min_aspect <= 0.0 || self.min_aspect > self.max_aspect {
            return Err(ClassifierError::Config(
                "glyph aspect bounds are invalid".to_string(),
            ));
        }
        if self.min_contour_area > self.max_contour_area {
            return Err(ClassifierError::Config(
                "min_contour_area cannot be greater than max_contour_area".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.min_compactness) {
            return Err(ClassifierError::Config(
                "min_compactness must be within [0, 1]".to_string(),
            ));
        }
        Ok(())
    }
}

/// Glyph-to-line clustering settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineGroupingConfig {
    /// Join tolerance as a fraction of the running mean glyph height
    pub proximity_factor: f64,
}

impl Default for LineGroupingConfig {
    fn default() -> Self {
        Self {
            proximity_factor: 0.5,
        }
    }
}

/// Per-line chaos index weights and rescale curve
///
/// The width, spacing, aspect and roughness components are zero in the
/// baseline and only contribute in the `improved_chaos` preset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChaosWeights {
    pub height: f64,
    pub angle: f64,
    pub center_y: f64,
    pub width: f64,
    /// Gaps between horizontally adjacent glyphs
    pub spacing: f64,
    pub aspect: f64,
    /// Baseline variance over squared mean height
    pub y_roughness: f64,
    /// Angle variance over `angle_roughness_variance`
    pub angle_roughness: f64,
    /// Angle variance that saturates angle roughness
    pub angle_roughness_variance: f64,
    /// Measure angle spread on `|angle|`, so mirrored slants count as equal
    pub absolute_angles: bool,
    /// Angle standard deviation (degrees) that saturates angle chaos
    pub angle_normalizer_degrees: f64,
    /// Angle variance below which the line is treated as printed evidence
    pub printed_angle_variance: f64,
    /// Factor applied to angle chaos for printed evidence
    pub printed_angle_damping: f64,
    /// Values below this are scaled by `low_factor`
    pub low_breakpoint: f64,
    pub low_factor: f64,
    /// Values above this are remapped to `high_base + (x - high_breakpoint) * high_slope`
    pub high_breakpoint: f64,
    pub high_base: f64,
    pub high_slope: f64,
    /// Lines above this chaos index count as chaotic in summaries
    pub chaotic_line_threshold: f64,
}

impl Default for ChaosWeights {
    fn default() -> Self {
        Self {
            height: 0.3,
            angle: 0.4,
            center_y: 0.3,
            width: 0.0,
            spacing: 0.0,
            aspect: 0.0,
            y_roughness: 0.0,
            angle_roughness: 0.0,
            angle_roughness_variance: 100.0,
            absolute_angles: false,
            angle_normalizer_degrees: 15.0,
            printed_angle_variance: 25.0,
            printed_angle_damping: 0.5,
            low_breakpoint: 0.2,
            low_factor: 0.5,
            high_breakpoint: 0.6,
            high_base: 0.5,
            high_slope: 1.25,
            chaotic_line_threshold: 0.5,
        }
    }
}

/// Soft per-block thresholds; a block "votes" for handwriting per exceeded metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockThresholds {
    pub density: f64,
    pub contrast: f64,
    pub edge_density: f64,
    /// Canny hysteresis thresholds for edge density
    pub canny_low: f32,
    pub canny_high: f32,
}

impl Default for BlockThresholds {
    fn default() -> Self {
        Self {
            density: 0.25,
            contrast: 0.3,
            edge_density: 0.05,
            canny_low: 50.0,
            canny_high: 150.0,
        }
    }
}

/// Weights combining the per-metric block ratios into the handwritten score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateWeights {
    pub density: f64,
    pub contrast: f64,
    pub edge_density: f64,
}

impl Default for AggregateWeights {
    fn default() -> Self {
        Self {
            density: 0.4,
            contrast: 0.3,
            edge_density: 0.3,
        }
    }
}

/// All scoring constants of the pipeline
///
/// Every historical variant of the scoring heuristics is a named preset of this
/// struct rather than a separate code path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    pub chaos: ChaosWeights,
    pub blocks: BlockThresholds,
    pub aggregate: AggregateWeights,
    /// Scores strictly above this route to the handwritten model
    pub decision_threshold: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self::baseline()
    }
}

impl ScoringWeights {
    /// Names accepted by [`ScoringWeights::preset`]
    pub const PRESET_NAMES: [&'static str; 3] = ["baseline", "strict_blocks", "improved_chaos"];

    /// Production weights
    pub fn baseline() -> Self {
        Self {
            chaos: ChaosWeights::default(),
            blocks: BlockThresholds::default(),
            aggregate: AggregateWeights::default(),
            decision_threshold: 0.35,
        }
    }

    /// Earlier, stricter block thresholds (dense > 0.3, irregular edges > 0.1)
    pub fn strict_blocks() -> Self {
        Self {
            blocks: BlockThresholds {
                density: 0.3,
                contrast: 0.3,
                edge_density: 0.1,
                ..BlockThresholds::default()
            },
            ..Self::baseline()
        }
    }

    /// Eight-component chaos index on absolute angles, without printed-angle
    /// damping, and a sharper rescale curve
    pub fn improved_chaos() -> Self {
        Self {
            chaos: ChaosWeights {
                height: 0.15,
                width: 0.10,
                angle: 0.25,
                center_y: 0.15,
                spacing: 0.10,
                aspect: 0.10,
                y_roughness: 0.10,
                angle_roughness: 0.05,
                absolute_angles: true,
                printed_angle_damping: 1.0,
                angle_normalizer_degrees: 10.0,
                low_breakpoint: 0.3,
                low_factor: 0.7,
                high_base: 0.6,
                high_slope: 1.5,
                ..ChaosWeights::default()
            },
            ..Self::baseline()
        }
    }

    /// Look up a preset by name
    pub fn preset(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "baseline" | "default" => Some(Self::baseline()),
            "strict_blocks" => Some(Self::strict_blocks()),
            "improved_chaos" => Some(Self::improved_chaos()),
            _ => None,
        }
    }

    /// Validate scoring configuration
    pub fn validate(&self) -> ClassifierResult<()> {
        if !(0.0..1.0).contains(&self.decision_threshold) {
            return Err(ClassifierError::Config(format!(
                "decision_threshold must be within [0, 1), got {}",
                self.decision_threshold
            )));
        }

        let aggregate = &self.aggregate;
        if [aggregate.density, aggregate.contrast, aggregate.edge_density]
            .iter()
            .any(|w| *w < 0.0)
        {
            return Err(ClassifierError::Config(
                "aggregate weights cannot be negative".to_string(),
            ));
        }
        let aggregate_sum = aggregate.density + aggregate.contrast + aggregate.edge_density;
        if aggregate_sum > 1.0 + 1e-9 {
            return Err(ClassifierError::Config(format!(
                "aggregate weights must sum to at most 1.0, got {:.3}",
                aggregate_sum
            )));
        }

        let chaos = &self.chaos;
        if [
            chaos.height,
            chaos.angle,
            chaos.center_y,
            chaos.width,
            chaos.spacing,
            chaos.aspect,
            chaos.y_roughness,
            chaos.angle_roughness,
        ]
        .iter()
        .any(|w| *w < 0.0)
        {
            return Err(ClassifierError::Config(
                "chaos weights cannot be negative".to_string(),
            ));
        }
        if chaos.angle_normalizer_degrees <= 0.0 || chaos.angle_roughness_variance <= 0.0 {
            return Err(ClassifierError::Config(
                "angle normalizers must be greater than 0".to_string(),
            ));
        }
        if chaos.low_breakpoint > chaos.high_breakpoint {
            return Err(ClassifierError::Config(format!(
                "chaos low_breakpoint ({}) must be <= high_breakpoint ({})",
                chaos.low_breakpoint, chaos.high_breakpoint
            )));
        }

        let blocks = &self.blocks;
        if blocks.canny_low < 0.0 || blocks.canny_high < blocks.canny_low {
            return Err(ClassifierError::Config(
                "block canny thresholds are invalid".to_string(),
            ));
        }
        Ok(())
    }
}

/// Worker pool settings for the async facade
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Number of worker threads; 0 means one per available core
    pub threads: usize,
    /// Per-image time budget in milliseconds, queueing included
    pub timeout_ms: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            threads: 0,
            timeout_ms: 5_000,
        }
    }
}

impl WorkerConfig {
    /// Resolve the effective thread count
    pub fn effective_threads(&self) -> usize {
        if self.threads > 0 {
            return self.threads;
        }
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    }

    /// Validate worker configuration
    pub fn validate(&self) -> ClassifierResult<()> {
        if self.timeout_ms == 0 {
            return Err(ClassifierError::Config("timeout_ms cannot be 0".to_string()));
        }
        if self.threads > 256 {
            return Err(ClassifierError::Config(
                "worker threads cannot be greater than 256".to_string(),
            ));
        }
        Ok(())
    }
}

/// Unified classifier configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassifierConfig {
    pub normalizer: NormalizerConfig,
    pub skew: SkewConfig,
    pub regions: RegionConfig,
    pub table: TableFilterConfig,
    pub threshold: AdaptiveThresholdConfig,
    pub glyphs: GlyphConfig,
    pub lines: LineGroupingConfig,
    pub scoring: ScoringWeights,
    pub worker: WorkerConfig,
}

impl ClassifierConfig {
    /// Load configuration from environment variables on top of the defaults
    pub fn from_env() -> ClassifierResult<Self> {
        let mut config = Self::default();

        if let Ok(name) = env::var("RECEIPT_SCORING_PRESET") {
            config.scoring = ScoringWeights::preset(&name).ok_or_else(|| {
                ClassifierError::Config(format!(
                    "RECEIPT_SCORING_PRESET must be one of {:?}, got '{}'",
                    ScoringWeights::PRESET_NAMES,
                    name
                ))
            })?;
        }

        env_override(
            "RECEIPT_MAX_WORKING_WIDTH",
            &mut config.normalizer.max_working_width,
        )?;
        env_override(
            "RECEIPT_DECISION_THRESHOLD",
            &mut config.scoring.decision_threshold,
        )?;
        env_override("RECEIPT_HEADER_FRACTION", &mut config.table.header_fraction)?;
        env_override("RECEIPT_FOOTER_FRACTION", &mut config.table.footer_fraction)?;
        env_override(
            "RECEIPT_SIDE_MARGIN_FRACTION",
            &mut config.table.side_margin_fraction,
        )?;
        env_override("RECEIPT_WORKER_THREADS", &mut config.worker.threads)?;
        env_override("RECEIPT_CLASSIFY_TIMEOUT_MS", &mut config.worker.timeout_ms)?;

        Ok(config)
    }

    /// Validate all configuration sections
    pub fn validate(&self) -> ClassifierResult<()> {
        self.normalizer.validate()?;
        self.skew.validate()?;
        self.regions.validate()?;
        self.table.validate()?;
        self.threshold.validate()?;
        self.glyphs.validate()?;
        if self.lines.proximity_factor < 0.0 {
            return Err(ClassifierError::Config(
                "line proximity_factor cannot be negative".to_string(),
            ));
        }
        self.scoring.validate()?;
        self.worker.validate()?;
        Ok(())
    }

    /// Get a summary of the current configuration for logging
    pub fn summary(&self) -> String {
        format!(
            "Configuration: max_working_width={}, decision_threshold={}, header/footer/margin={}/{}/{}, workers={}, timeout_ms={}",
            self.normalizer.max_working_width,
            self.scoring.decision_threshold,
            self.table.header_fraction,
            self.table.footer_fraction,
            self.table.side_margin_fraction,
            self.worker.effective_threads(),
            self.worker.timeout_ms
        )
    }
}

fn env_override<T: FromStr>(name: &str, target: &mut T) -> ClassifierResult<()> {
    if let Ok(raw) = env::var(name) {
        *target = raw
            .trim()
            .parse()
            .map_err(|_| ClassifierError::Config(format!("{} must be a valid number", name)))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_validation() {
        let config = ClassifierConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.normalizer.max_working_width, 1000);
        assert_eq!(config.scoring.decision_threshold, 0.35);
        assert_eq!(config.table.header_fraction, 0.20);
        assert_eq!(config.table.footer_fraction, 0.15);
        assert_eq!(config.table.side_margin_fraction, 0.05);
    }

    #[test]
    fn test_presets_are_valid() {
        for name in ScoringWeights::PRESET_NAMES {
            let preset = ScoringWeights::preset(name).expect("preset should exist");
            assert!(preset.validate().is_ok(), "preset {} should validate", name);
        }
        assert!(ScoringWeights::preset("nonexistent").is_none());
        assert_eq!(ScoringWeights::preset("Baseline"), Some(ScoringWeights::baseline()));
    }

    #[test]
    fn test_strict_blocks_preset_values() {
        let strict = ScoringWeights::strict_blocks();
        assert_eq!(strict.blocks.density, 0.3);
        assert_eq!(strict.blocks.edge_density, 0.1);
        assert_eq!(strict.decision_threshold, 0.35);
        assert_eq!(strict.chaos, ChaosWeights::default());
    }

    #[test]
    fn test_improved_chaos_preset_values() {
        let chaos = ScoringWeights::improved_chaos().chaos;
        let component_sum = chaos.height
            + chaos.width
            + chaos.angle
            + chaos.center_y
            + chaos.spacing
            + chaos.aspect
            + chaos.y_roughness
            + chaos.angle_roughness;
        assert!((component_sum - 1.0).abs() < 1e-12);
        assert!(chaos.absolute_angles);
        assert_eq!(chaos.printed_angle_damping, 1.0);

        let baseline = ChaosWeights::default();
        assert_eq!(baseline.width + baseline.spacing + baseline.aspect, 0.0);
        assert_eq!(baseline.y_roughness + baseline.angle_roughness, 0.0);

        let mut scoring = ScoringWeights::improved_chaos();
        scoring.chaos.spacing = -0.1;
        assert!(scoring.validate().is_err());
    }

    #[test]
    fn test_scoring_validation() {
        let mut scoring = ScoringWeights::baseline();

        scoring.decision_threshold = 1.5;
        assert!(scoring.validate().is_err());
        scoring.decision_threshold = 0.35;

        scoring.aggregate.density = 0.9;
        assert!(scoring.validate().is_err());
        scoring.aggregate.density = 0.4;

        scoring.chaos.low_breakpoint = 0.8;
        assert!(scoring.validate().is_err());
        scoring.chaos.low_breakpoint = 0.2;

        assert!(scoring.validate().is_ok());
    }

    #[test]
    fn test_table_filter_validation() {
        let mut config = TableFilterConfig::default();
        assert!(config.validate().is_ok());

        config.header_fraction = 0.6;
        config.footer_fraction = 0.5;
        assert!(config.validate().is_err());
        config.header_fraction = 0.2;
        config.footer_fraction = 0.15;

        config.side_margin_fraction = 0.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_adaptive_threshold_validation_and_sigma() {
        let mut config = AdaptiveThresholdConfig::default();
        assert!((config.sigma() - 2.0).abs() < 1e-6);

        config.block_size = 10;
        assert!(config.validate().is_err());
        config.block_size = 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_worker_config() {
        let mut config = WorkerConfig::default();
        assert!(config.effective_threads() >= 1);

        config.threads = 3;
        assert_eq!(config.effective_threads(), 3);

        config.timeout_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_summary_mentions_threshold() {
        let summary = ClassifierConfig::default().summary();
        assert!(summary.contains("decision_threshold=0.35"));
        assert!(summary.contains("max_working_width=1000"));
    }
}
