//! # Receipt Structure Analysis
//!
//! The stages that run after preprocessing:
//! - `regions`: stable-extremal-region proposals merged into text rows
//! - `table`: item-table band selection
//! - `glyphs`: character contours from an adaptive-threshold mask
//! - `lines`: glyph clustering into text lines
//! - `chaos`: per-line irregularity index
//! - `blocks`: per-region texture metrics
//! - `decision`: block votes to handwritten score and routing decision
//! - `types`: geometry and stage outputs

pub mod blocks;
pub mod chaos;
pub mod decision;
pub mod glyphs;
pub mod lines;
pub mod regions;
pub mod table;
pub mod types;

pub use types::{
    BlockMetrics, BlockVoteRatios, CharacterGlyph, ChaosMetrics, ChaosSummary, Line,
    ModelDecision, Rect, RoutingModel, TableRegion, TextRegion,
};

pub use blocks::{analyze_block, analyze_blocks};
pub use chaos::{compute_chaos, summarize_chaos};
pub use decision::{decide, decide_from_blocks, handwritten_score, vote_ratios};
pub use glyphs::extract_glyphs;
pub use lines::group_into_lines;
pub use regions::{detect_text_regions, intensity_levels};
pub use table::filter_table_regions;
