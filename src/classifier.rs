//! # Receipt Classifier Pipeline
//!
//! Runs the stages in order on one image and produces the routing decision:
//!
//! 1. decode and bound the working resolution
//! 2. skew correction (failures fall back to the unrotated image)
//! 3. text-region detection and item-table selection
//! 4. block texture metrics, votes and the handwritten score
//!
//! With diagnostics enabled the per-line chaos signal is computed as well; it
//! never changes the decision.
//!
//! Only decode errors reach the caller. Every other failure, including a
//! panic inside a stage, becomes the handwritten fallback through
//! [`decision_for_stage_error`].

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

use image::GrayImage;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::analysis::types::{
    BlockMetrics, BlockVoteRatios, ChaosMetrics, ChaosSummary, ModelDecision, Rect, TableRegion,
    TextRegion,
};
use crate::analysis::{
    analyze_blocks, compute_chaos, decide_from_blocks, detect_text_regions, extract_glyphs,
    filter_table_regions, group_into_lines, summarize_chaos,
};
use crate::config::ClassifierConfig;
use crate::context::ImageProcessingContext;
use crate::errors::error_logging::log_absorbed_failure;
use crate::errors::{ClassifierResult, Stage, StageError, StageResult};
use crate::observability::{
    classification_span, record_classification_metrics, record_decode_failure,
    ClassificationOutcome,
};
use crate::preprocessing::{correct_skew, decode_and_normalize, NormalizedImage};

/// Why a report carries no measured decision
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FallbackReason {
    /// Region detection found nothing; printed model with zero score
    NoTextRegions,
    /// No region survived the table filter; printed model with zero score
    NoTableRegions,
    /// A stage failed; handwritten fallback
    StageFailure { stage: Stage, message: String },
    /// The time budget ran out; handwritten fallback
    Timeout { budget_ms: u64 },
}

impl FallbackReason {
    /// Whether this reason forces the handwritten fallback decision
    pub fn forces_fallback(&self) -> bool {
        matches!(
            self,
            FallbackReason::StageFailure { .. } | FallbackReason::Timeout { .. }
        )
    }
}

/// Decision plus every intermediate result of one classification
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationReport {
    pub decision: ModelDecision,
    pub original_dimensions: (u32, u32),
    pub working_dimensions: (u32, u32),
    pub skew_angle_degrees: Option<f32>,
    pub rotated: bool,
    pub text_regions: Vec<Rect>,
    pub table_regions: Vec<Rect>,
    pub block_metrics: Vec<BlockMetrics>,
    pub vote_ratios: BlockVoteRatios,
    /// Per-line chaos, empty unless diagnostics ran
    pub line_chaos: Vec<ChaosMetrics>,
    pub chaos_summary: Option<ChaosSummary>,
    pub fallback: Option<FallbackReason>,
    pub elapsed_ms: u64,
}

impl ClassificationReport {
    fn empty(
        decision: ModelDecision,
        original_dimensions: (u32, u32),
        working_dimensions: (u32, u32),
    ) -> Self {
        Self {
            decision,
            original_dimensions,
            working_dimensions,
            skew_angle_degrees: None,
            rotated: false,
            text_regions: Vec::new(),
            table_regions: Vec::new(),
            block_metrics: Vec::new(),
            vote_ratios: BlockVoteRatios::default(),
            line_chaos: Vec::new(),
            chaos_summary: None,
            fallback: None,
            elapsed_ms: 0,
        }
    }

    /// Report for an image whose time budget ran out before a decision
    pub fn timed_out(threshold: f64, budget_ms: u64) -> Self {
        let mut report = Self::empty(ModelDecision::fallback(threshold), (0, 0), (0, 0));
        report.fallback = Some(FallbackReason::Timeout { budget_ms });
        report.elapsed_ms = budget_ms;
        report
    }

    pub fn outcome(&self) -> ClassificationOutcome {
        match &self.fallback {
            Some(FallbackReason::Timeout { .. }) => ClassificationOutcome::TimedOut,
            Some(FallbackReason::StageFailure { .. }) => ClassificationOutcome::Fallback,
            _ => ClassificationOutcome::Completed,
        }
    }
}

/// The fallback policy: any stage failure routes to the handwritten model
pub fn decision_for_stage_error(error: &StageError, threshold: f64) -> (ModelDecision, FallbackReason) {
    let (stage, message) = match error {
        StageError::TransformFailure(message) => (Stage::SkewCorrection, message.clone()),
        StageError::StageFailure { stage, message } => (*stage, message.clone()),
    };
    (
        ModelDecision::fallback(threshold),
        FallbackReason::StageFailure { stage, message },
    )
}

/// Classify encoded image bytes.
///
/// # Errors
///
/// Returns [`crate::errors::ClassifierError::Decode`] when the bytes are not
/// a decodable image. No other error is surfaced.
pub fn classify_receipt(
    context: &ImageProcessingContext,
    image_bytes: &[u8],
) -> ClassifierResult<ModelDecision> {
    classify_report(context, image_bytes).map(|report| report.decision)
}

/// Classify encoded image bytes and return the full diagnostic report
pub fn analyze_receipt(
    context: &ImageProcessingContext,
    image_bytes: &[u8],
) -> ClassifierResult<ClassificationReport> {
    classify_bytes(context, image_bytes, true)
}

/// Like [`analyze_receipt`] without the chaos diagnostics
pub fn classify_report(
    context: &ImageProcessingContext,
    image_bytes: &[u8],
) -> ClassifierResult<ClassificationReport> {
    classify_bytes(context, image_bytes, false)
}

fn classify_bytes(
    context: &ImageProcessingContext,
    image_bytes: &[u8],
    with_diagnostics: bool,
) -> ClassifierResult<ClassificationReport> {
    let span = classification_span(image_bytes.len());
    let _guard = span.enter();
    let start_time = Instant::now();

    let normalized =
        decode_and_normalize(image_bytes, &context.config().normalizer).map_err(|error| {
            record_decode_failure();
            warn!(
                target: "receipt_classifier",
                error = %error,
                image_bytes = image_bytes.len(),
                "Rejected undecodable image"
            );
            error
        })?;

    let mut report = run_pipeline(context, &normalized, with_diagnostics);
    let elapsed = start_time.elapsed();
    report.elapsed_ms = elapsed.as_millis() as u64;

    record_classification_metrics(report.decision.decision, report.outcome(), elapsed);
    info!(
        target: "receipt_classifier",
        model = %report.decision.decision,
        handwritten_score = report.decision.handwritten_score,
        threshold = report.decision.threshold,
        table_regions = report.table_regions.len(),
        fallback = ?report.fallback,
        "Routed receipt in {}ms",
        report.elapsed_ms
    );
    Ok(report)
}

/// Run every stage after decoding.
///
/// Never fails: stage errors and panics resolve to the fallback report.
pub fn run_pipeline(
    context: &ImageProcessingContext,
    normalized: &NormalizedImage,
    with_diagnostics: bool,
) -> ClassificationReport {
    let working_dimensions = normalized.image.dimensions();
    let attempt = panic::catch_unwind(AssertUnwindSafe(|| {
        run_stages(context, normalized, with_diagnostics)
    }));
    let result = attempt.unwrap_or_else(|payload| {
        Err(StageError::failure(
            Stage::Pipeline,
            format!("stage panicked: {}", panic_message(payload.as_ref())),
        ))
    });

    match result {
        Ok(report) => report,
        Err(error) => {
            log_absorbed_failure(&error, "handwritten_model", Some(working_dimensions));
            let (decision, reason) =
                decision_for_stage_error(&error, context.config().scoring.decision_threshold);
            let mut report = ClassificationReport::empty(
                decision,
                normalized.original_dimensions,
                working_dimensions,
            );
            report.fallback = Some(reason);
            report
        }
    }
}

fn run_stages(
    context: &ImageProcessingContext,
    normalized: &NormalizedImage,
    with_diagnostics: bool,
) -> StageResult<ClassificationReport> {
    let config = context.config();
    let threshold = config.scoring.decision_threshold;

    let deskewed = correct_skew(&normalized.image, &config.skew);
    let gray = deskewed.image.gray();
    let (width, height) = deskewed.image.dimensions();

    let mut report = ClassificationReport::empty(
        ModelDecision::no_evidence(threshold),
        normalized.original_dimensions,
        (width, height),
    );
    report.skew_angle_degrees = deskewed.skew_angle_degrees;
    report.rotated = deskewed.rotated;

    let text_regions = detect_text_regions(gray, &config.regions, context.intensity_levels());
    report.text_regions = text_regions.iter().map(TextRegion::rect).collect();
    if text_regions.is_empty() {
        report.fallback = Some(FallbackReason::NoTextRegions);
        return Ok(report);
    }

    let table_regions = filter_table_regions(&text_regions, width, height, &config.table);
    report.table_regions = table_regions.iter().map(TableRegion::rect).collect();
    debug!(
        target: "receipt_classifier",
        text_regions = text_regions.len(),
        table_regions = table_regions.len(),
        width,
        height,
        "Detected receipt regions"
    );
    if table_regions.is_empty() {
        report.fallback = Some(FallbackReason::NoTableRegions);
        return Ok(report);
    }

    let block_metrics = analyze_blocks(
        gray,
        &table_regions,
        &config.threshold,
        &config.scoring.blocks,
    )?;
    let (decision, vote_ratios) = decide_from_blocks(&block_metrics, &config.scoring);
    if !decision.handwritten_score.is_finite() {
        return Err(StageError::failure(
            Stage::Decision,
            "handwritten score is not a finite number",
        ));
    }
    report.decision = decision;
    report.block_metrics = block_metrics;
    report.vote_ratios = vote_ratios;

    if with_diagnostics {
        match line_chaos(gray, &table_regions, config) {
            Ok(line_chaos) => {
                report.chaos_summary = Some(summarize_chaos(&line_chaos, &config.scoring.chaos));
                report.line_chaos = line_chaos;
            }
            Err(error) => {
                log_absorbed_failure(&error, "chaos_diagnostics_skipped", Some((width, height)))
            }
        }
    }

    Ok(report)
}

/// Chaos metrics of every line found inside the table regions
pub fn line_chaos(
    gray: &GrayImage,
    regions: &[TableRegion],
    config: &ClassifierConfig,
) -> StageResult<Vec<ChaosMetrics>> {
    let mut metrics = Vec::new();
    for region in regions {
        let glyphs = extract_glyphs(gray, region.rect(), &config.threshold, &config.glyphs)?;
        metrics.extend(
            group_into_lines(&glyphs, &config.lines)
                .iter()
                .map(|line| compute_chaos(line, &config.scoring.chaos)),
        );
    }
    Ok(metrics)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
