//! # Classifier Integration Tests
//!
//! End-to-end routing decisions on synthetic receipts through the public API.


use receipt_classifier::classifier::FallbackReason;
use receipt_classifier::config::ScoringWeights;
use receipt_classifier::visualization::visualize_regions;
use receipt_classifier::{
    ClassifierConfig, ClassifierError, ImageProcessingContext, RoutingModel,
};
use test_helpers::*;

#[test]
fn test_blank_receipt_routes_to_printed_with_zero_score() {
    let context = ImageProcessingContext::default();
    let decision = context.classify(&encode_png(&blank_receipt())).unwrap();

    assert_eq!(decision.decision, RoutingModel::PrintedModel);
    assert_eq!(decision.handwritten_score, 0.0);
    assert_eq!(decision.threshold, 0.35);
}

#[test]
fn test_corrupted_bytes_are_a_decode_error() {
    let context = ImageProcessingContext::default();

    let mut truncated = encode_png(&blank_receipt());
    truncated.truncate(40);
    for bytes in [b"definitely not an image".to_vec(), Vec::new(), truncated] {
        assert!(matches!(
            context.classify(&bytes),
            Err(ClassifierError::Decode(_))
        ));
    }
}

#[test]
fn test_regular_faint_grid_routes_to_printed() {
    let context = ImageProcessingContext::default();
    let report = context
        .analyze(&encode_png(&printed_grid_receipt()))
        .unwrap();

    assert_eq!(report.table_regions.len(), 5, "{:?}", report.table_regions);
    assert_eq!(report.block_metrics.len(), 5);
    assert_eq!(report.decision.decision, RoutingModel::PrintedModel);
    assert_eq!(report.decision.handwritten_score, 0.0);
    assert_eq!(report.fallback, None);
    assert!(!report.rotated);
    assert!(report.chaos_summary.is_some());
    assert!(!report.line_chaos.is_empty());
    for line in &report.line_chaos {
        assert_eq!(line.chaos_index, 0.0, "{:?}", line);
        assert_eq!(line.height_chaos, 0.0);
        assert_eq!(line.angle_chaos, 0.0);
        assert_eq!(line.center_y_chaos, 0.0);
    }
}

#[test]
fn test_dense_irregular_marks_route_to_handwritten() {
    let context = ImageProcessingContext::default();
    let report = context.analyze(&encode_png(&handwritten_receipt())).unwrap();

    assert!(!report.table_regions.is_empty());
    assert_eq!(report.decision.decision, RoutingModel::HandwrittenModel);
    assert!(report.decision.handwritten_score > report.decision.threshold);
    assert!(report.vote_ratios.contrast_ratio > 0.0);
    assert!(report.vote_ratios.edge_ratio > 0.0);
    assert_eq!(report.fallback, None);

    // Slanted marks disagree in orientation within a line
    assert!(report.line_chaos.iter().any(|line| line.angle_chaos > 0.0));
}

#[test]
fn test_single_pixel_image_has_no_evidence() {
    let context = ImageProcessingContext::default();
    let image = image::GrayImage::from_pixel(1, 1, image::Luma([0]));
    let report = context.analyze(&encode_png(&image)).unwrap();

    assert_eq!(report.decision.decision, RoutingModel::PrintedModel);
    assert_eq!(report.decision.handwritten_score, 0.0);
    assert_eq!(report.fallback, Some(FallbackReason::NoTextRegions));
}

#[test]
fn test_scores_and_chaos_stay_in_unit_interval() {
    let context = ImageProcessingContext::default();
    for image in [printed_grid_receipt(), handwritten_receipt(), noise_image(300, 400, 9)] {
        let report = context.analyze(&encode_png(&image)).unwrap();
        assert!((0.0..=1.0).contains(&report.decision.handwritten_score));
        for line in &report.line_chaos {
            assert!((0.0..=1.0).contains(&line.chaos_index), "{:?}", line);
        }
    }
}

#[test]
fn test_identical_bytes_give_identical_decisions() {
    let context = ImageProcessingContext::default();
    let bytes = encode_png(&handwritten_receipt());

    let first = context.classify(&bytes).unwrap();
    let second = context.classify(&bytes).unwrap();
    assert_eq!(first, second);

    let other_context = ImageProcessingContext::default();
    assert_eq!(other_context.classify(&bytes).unwrap(), first);
}

#[test]
fn test_marks_outside_the_table_band_are_ignored() {
    // Dark marks only in the header band
    let mut image = blank_receipt();
    let marks = handwritten_receipt();
    for y in 0..150 {
        for x in 0..RECEIPT_WIDTH {
            image.put_pixel(x, y, *marks.get_pixel(x, y + 250));
        }
    }

    let context = ImageProcessingContext::default();
    let report = context.analyze(&encode_png(&image)).unwrap();
    assert!(!report.text_regions.is_empty());
    assert!(report.table_regions.is_empty());
    assert_eq!(report.fallback, Some(FallbackReason::NoTableRegions));
    assert_eq!(report.decision.decision, RoutingModel::PrintedModel);
    assert_eq!(report.decision.handwritten_score, 0.0);
}

#[test]
fn test_wide_images_are_downscaled_to_working_width() {
    let mut config = ClassifierConfig::default();
    config.normalizer.max_working_width = 450;
    let context = ImageProcessingContext::new(config).unwrap();

    let report = context.analyze(&encode_png(&printed_grid_receipt())).unwrap();
    assert_eq!(report.original_dimensions, (RECEIPT_WIDTH, RECEIPT_HEIGHT));
    assert_eq!(report.working_dimensions, (450, 500));
}

#[test]
fn test_presets_share_the_pipeline() {
    let bytes = encode_png(&handwritten_receipt());
    for name in ScoringWeights::PRESET_NAMES {
        let mut config = ClassifierConfig::default();
        config.scoring = ScoringWeights::preset(name).unwrap();
        let context = ImageProcessingContext::new(config).unwrap();
        let decision = context.classify(&bytes).unwrap();
        assert!((0.0..=1.0).contains(&decision.handwritten_score), "{}", name);
    }
}

#[test]
fn test_overlay_of_detected_regions() {
    let context = ImageProcessingContext::default();
    let bytes = encode_png(&printed_grid_receipt());
    let report = context.analyze(&bytes).unwrap();

    let jpeg = visualize_regions(&context, &bytes, &report.table_regions).unwrap();
    assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
    let overlay = image::load_from_memory(&jpeg).unwrap();
    assert_eq!(
        (overlay.width(), overlay.height()),
        (RECEIPT_WIDTH, RECEIPT_HEIGHT)
    );
}
