//! # Evaluation Integration Tests
//!
//! Labeled dataset discovery and accuracy reporting on a temporary directory.


use receipt_classifier::evaluation::{collect_labeled_samples, evaluate_dataset};
use receipt_classifier::{ImageProcessingContext, RoutingModel};
use std::fs;
use tempfile::tempdir;
use test_helpers::*;

fn write_dataset(root: &std::path::Path) {
    let printed = root.join("printed");
    let handwritten = root.join("handwritten");
    fs::create_dir_all(&printed).unwrap();
    fs::create_dir_all(&handwritten).unwrap();

    fs::write(printed.join("b_blank.png"), encode_png(&blank_receipt())).unwrap();
    fs::write(printed.join("a_grid.png"), encode_png(&printed_grid_receipt())).unwrap();
    fs::write(printed.join("notes.txt"), "not a sample").unwrap();
    fs::write(handwritten.join("marks.PNG"), encode_png(&handwritten_receipt())).unwrap();
    fs::write(handwritten.join("broken.jpg"), b"truncated").unwrap();
}

#[test]
fn test_collect_labeled_samples() {
    let dir = tempdir().unwrap();
    write_dataset(dir.path());

    let samples = collect_labeled_samples(dir.path()).unwrap();
    let names: Vec<_> = samples
        .iter()
        .map(|s| {
            (
                s.path.file_name().unwrap().to_string_lossy().to_string(),
                s.expected,
            )
        })
        .collect();
    assert_eq!(
        names,
        vec![
            ("a_grid.png".to_string(), RoutingModel::PrintedModel),
            ("b_blank.png".to_string(), RoutingModel::PrintedModel),
            ("broken.jpg".to_string(), RoutingModel::HandwrittenModel),
            ("marks.PNG".to_string(), RoutingModel::HandwrittenModel),
        ]
    );
}

#[test]
fn test_missing_class_directories_yield_no_samples() {
    let dir = tempdir().unwrap();
    assert!(collect_labeled_samples(dir.path()).unwrap().is_empty());
}

#[test]
fn test_evaluate_dataset_reports_accuracy_and_failures() {
    let dir = tempdir().unwrap();
    write_dataset(dir.path());

    let context = ImageProcessingContext::default();
    let report = evaluate_dataset(&context, dir.path(), "baseline").unwrap();

    assert_eq!(report.printed.total, 2);
    assert_eq!(report.printed.correct, 2);
    assert_eq!(report.handwritten.total, 2);
    assert_eq!(report.handwritten.correct, 1);
    assert_eq!(report.failures, 1);
    assert_eq!(report.overall.correct, 3);
    assert_eq!(report.sweep.len(), 18);

    let best = report.best.unwrap();
    assert_eq!(best.accuracy, 0.75);

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["preset"], "baseline");
    assert_eq!(json["samples"].as_array().unwrap().len(), 4);
}
