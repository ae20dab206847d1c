use anyhow::{Context, Result};
use receipt_classifier::observability::{self, ObservabilityConfig};
use receipt_classifier::visualization::visualize_regions;
use receipt_classifier::{ClassifierConfig, ClassifierError, ClassifierPool, ImageProcessingContext};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};

const USAGE: &str = "Usage: receipt-classifier [--annotate DIR] IMAGE...";

/// Command line arguments
#[derive(Debug, Default)]
struct Args {
    annotate_dir: Option<PathBuf>,
    images: Vec<PathBuf>,
}

fn parse_args(raw: impl IntoIterator<Item = String>) -> Result<Args> {
    let mut args = Args::default();
    let mut raw = raw.into_iter();
    while let Some(arg) = raw.next() {
        match arg.as_str() {
            "--annotate" => {
                let dir = raw
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--annotate requires a directory. {}", USAGE))?;
                args.annotate_dir = Some(PathBuf::from(dir));
            }
            "-h" | "--help" => return Err(anyhow::anyhow!(USAGE)),
            _ => args.images.push(PathBuf::from(arg)),
        }
    }
    if args.images.is_empty() {
        return Err(anyhow::anyhow!("No input images given. {}", USAGE));
    }
    Ok(args)
}

/// Write the region overlay for one image next to the others in `dir`
fn write_annotation(
    context: &ImageProcessingContext,
    dir: &Path,
    image_path: &Path,
    bytes: &[u8],
    report: &receipt_classifier::ClassificationReport,
) -> Result<PathBuf> {
    let mut regions = report.text_regions.clone();
    regions.extend(report.table_regions.iter().copied());
    let jpeg = visualize_regions(context, bytes, &regions)?;

    let stem = image_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("receipt");
    let target = dir.join(format!("{}_regions.jpg", stem));
    fs::write(&target, jpeg).with_context(|| format!("Failed to write {}", target.display()))?;
    Ok(target)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file first
    dotenvy::dotenv().ok();

    observability::init_tracing(&ObservabilityConfig::from_env())?;

    let args = parse_args(env::args().skip(1))?;
    let config = ClassifierConfig::from_env()
        .map_err(|e| anyhow::anyhow!("Configuration validation failed: {}", e))?;
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Configuration validation failed: {}", e))?;
    info!("{}", config.summary());

    if let Some(dir) = &args.annotate_dir {
        fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    }

    let annotation_context = ImageProcessingContext::new(config.clone())?;
    let pool = ClassifierPool::new(config)?;

    let mut failures = 0usize;
    for path in &args.images {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) => {
                error!(path = %path.display(), error = %e, "Failed to read image");
                failures += 1;
                continue;
            }
        };

        let report = match pool.analyze(bytes.clone()).await {
            Ok(report) => report,
            Err(ClassifierError::Decode(message)) => {
                error!(path = %path.display(), error = %message, "Image could not be decoded");
                failures += 1;
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        let line = serde_json::json!({
            "path": path.display().to_string(),
            "report": report,
        });
        println!("{}", line);

        if let Some(dir) = &args.annotate_dir {
            match write_annotation(&annotation_context, dir, path, &bytes, &report) {
                Ok(target) => info!(path = %target.display(), "Wrote region overlay"),
                Err(e) => error!(path = %path.display(), error = %e, "Failed to write region overlay"),
            }
        }
    }

    if failures > 0 {
        return Err(anyhow::anyhow!(
            "{} of {} images could not be classified",
            failures,
            args.images.len()
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_images_and_annotate_dir() {
        let args = parse_args(strings(&["a.jpg", "--annotate", "out", "b.png"])).unwrap();
        assert_eq!(args.images, vec![PathBuf::from("a.jpg"), PathBuf::from("b.png")]);
        assert_eq!(args.annotate_dir, Some(PathBuf::from("out")));
    }

    #[test]
    fn test_parse_requires_images() {
        assert!(parse_args(strings(&[])).is_err());
        assert!(parse_args(strings(&["a.jpg", "--annotate"])).is_err());
    }
}
