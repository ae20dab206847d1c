//! # Decision Engine
//!
//! Turns per-block texture metrics into a handwritten score and a routing
//! decision. Each block votes once per metric that exceeds its soft
//! threshold; the vote shares are combined with fixed weights.

use super::types::{BlockMetrics, BlockVoteRatios, ModelDecision, RoutingModel};
use crate::config::{AggregateWeights, BlockThresholds, ScoringWeights};

/// Share of blocks exceeding each per-metric threshold
pub fn vote_ratios(metrics: &[BlockMetrics], thresholds: &BlockThresholds) -> BlockVoteRatios {
    if metrics.is_empty() {
        return BlockVoteRatios::default();
    }
    let mut votes = [0usize; 3];
    for m in metrics {
        votes[0] += usize::from(m.density > thresholds.density);
        votes[1] += usize::from(m.contrast > thresholds.contrast);
        votes[2] += usize::from(m.edge_density > thresholds.edge_density);
    }
    let total = metrics.len() as f64;
    BlockVoteRatios {
        density_ratio: votes[0] as f64 / total,
        contrast_ratio: votes[1] as f64 / total,
        edge_ratio: votes[2] as f64 / total,
        block_count: metrics.len(),
    }
}

/// Weighted combination of vote ratios, clamped to [0, 1]
pub fn handwritten_score(ratios: &BlockVoteRatios, weights: &AggregateWeights) -> f64 {
    let score = weights.density * ratios.density_ratio
        + weights.contrast * ratios.contrast_ratio
        + weights.edge_density * ratios.edge_ratio;
    score.clamp(0.0, 1.0)
}

/// Handwritten only when the score is strictly above the threshold
pub fn decide(score: f64, threshold: f64) -> RoutingModel {
    if score > threshold {
        RoutingModel::HandwrittenModel
    } else {
        RoutingModel::PrintedModel
    }
}

/// Score a receipt from its block metrics.
///
/// No blocks means no evidence: the printed model with a zero score.
pub fn decide_from_blocks(
    metrics: &[BlockMetrics],
    scoring: &ScoringWeights,
) -> (ModelDecision, BlockVoteRatios) {
    let threshold = scoring.decision_threshold;
    if metrics.is_empty() {
        return (ModelDecision::no_evidence(threshold), BlockVoteRatios::default());
    }
    let ratios = vote_ratios(metrics, &scoring.blocks);
    let score = handwritten_score(&ratios, &scoring.aggregate);
    let decision = ModelDecision {
        decision: decide(score, threshold),
        handwritten_score: score,
        threshold,
    };
    (decision, ratios)
}
