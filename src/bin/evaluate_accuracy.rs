use anyhow::{Context, Result};
use receipt_classifier::evaluation::{evaluate_dataset, EvaluationReport};
use receipt_classifier::observability::{self, ObservabilityConfig};
use receipt_classifier::{ClassifierConfig, ImageProcessingContext, ScoringWeights};
use std::path::PathBuf;

const USAGE: &str = "Usage: evaluate_accuracy DATASET_DIR [--preset NAME] [--json]";

#[derive(Debug, PartialEq)]
struct Args {
    dataset: PathBuf,
    preset: String,
    json: bool,
}

fn parse_args(raw: impl IntoIterator<Item = String>) -> Result<Args> {
    let mut dataset = None;
    let mut preset = "baseline".to_string();
    let mut json = false;

    let mut raw = raw.into_iter();
    while let Some(arg) = raw.next() {
        match arg.as_str() {
            "--preset" => {
                preset = raw
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--preset requires a name. {}", USAGE))?;
            }
            "--json" => json = true,
            "-h" | "--help" => return Err(anyhow::anyhow!(USAGE)),
            _ if dataset.is_none() => dataset = Some(PathBuf::from(arg)),
            _ => return Err(anyhow::anyhow!("Unexpected argument '{}'. {}", arg, USAGE)),
        }
    }

    Ok(Args {
        dataset: dataset.ok_or_else(|| anyhow::anyhow!("Missing dataset directory. {}", USAGE))?,
        preset,
        json,
    })
}

fn print_report(report: &EvaluationReport) {
    println!("Receipt routing accuracy ({} preset)", report.preset);
    println!("{}", "=".repeat(60));
    for (name, slice) in [
        ("Printed", &report.printed),
        ("Handwritten", &report.handwritten),
        ("Overall", &report.overall),
    ] {
        println!(
            "{:<12} {:>4}/{:<4} ({:.1}%)",
            name,
            slice.correct,
            slice.total,
            slice.accuracy() * 100.0
        );
    }
    println!(
        "Decision threshold: {:.2}, failures: {}, mean time: {:.0}ms",
        report.threshold, report.failures, report.mean_elapsed_ms
    );

    println!("\nMisrouted samples:");
    for sample in report.samples.iter().filter(|s| !s.is_correct()) {
        let predicted = sample
            .predicted
            .map(|p| p.label().to_string())
            .unwrap_or_else(|| "error".to_string());
        println!(
            "  {} expected {}, got {} (score {})",
            sample.path.display(),
            sample.expected.label(),
            predicted,
            sample
                .handwritten_score
                .map(|s| format!("{:.3}", s))
                .unwrap_or_else(|| "-".to_string())
        );
    }

    println!("\nThreshold sweep:");
    println!("  threshold  overall  printed  handwritten");
    for point in &report.sweep {
        println!(
            "  {:>9.2}  {:>6.1}%  {:>6.1}%  {:>10.1}%",
            point.threshold,
            point.accuracy * 100.0,
            point.printed_accuracy * 100.0,
            point.handwritten_accuracy * 100.0
        );
    }
    if let Some(best) = &report.best {
        println!(
            "\nBest threshold: {:.2} ({:.1}% overall)",
            best.threshold,
            best.accuracy * 100.0
        );
    }
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    observability::init_tracing(&ObservabilityConfig::from_env())?;

    let args = parse_args(std::env::args().skip(1))?;

    let mut config = ClassifierConfig::from_env()?;
    config.scoring = ScoringWeights::preset(&args.preset).ok_or_else(|| {
        anyhow::anyhow!(
            "Unknown preset '{}', expected one of {:?}",
            args.preset,
            ScoringWeights::PRESET_NAMES
        )
    })?;
    let context = ImageProcessingContext::new(config)?;

    let report = evaluate_dataset(&context, &args.dataset, &args.preset)
        .with_context(|| format!("Failed to read dataset {}", args.dataset.display()))?;
    if report.overall.total == 0 {
        return Err(anyhow::anyhow!(
            "No samples found under {} (expected printed/ and handwritten/)",
            args.dataset.display()
        ));
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}
