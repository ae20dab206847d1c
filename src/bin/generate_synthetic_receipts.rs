use ab_glyph::{FontVec, PxScale};
use anyhow::{Context, Result};
use image::{GrayImage, Luma};
use imageproc::drawing::{draw_line_segment_mut, draw_text_mut, text_size};
use imageproc::geometric_transformations::{rotate_about_center, Interpolation};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use receipt_classifier::evaluation::class_directory;
use receipt_classifier::RoutingModel;
use std::fs;
use std::path::{Path, PathBuf};

const USAGE: &str = "Usage: generate_synthetic_receipts OUTPUT_DIR [--count N] [--seed S]";

const RECEIPT_WIDTH: u32 = 900;
const RECEIPT_HEIGHT: u32 = 1300;

const ITEMS: [&str; 16] = [
    "Milk 1L", "Bread", "Eggs x10", "Butter", "Flour 1kg", "Sugar", "Tomatoes", "Onions",
    "Cheese", "Apples", "Rice 2kg", "Coffee", "Tea", "Salt", "Pasta", "Olive oil",
];

const SHOPS: [&str; 4] = ["CORNER MARKET", "FRESH FOODS", "CITY GROCERY", "DAILY STORE"];

#[derive(Debug, PartialEq)]
struct Args {
    output: PathBuf,
    count: usize,
    seed: u64,
}

fn parse_args(raw: impl IntoIterator<Item = String>) -> Result<Args> {
    let mut output = None;
    let mut count = 20;
    let mut seed = 42;

    let mut raw = raw.into_iter();
    while let Some(arg) = raw.next() {
        match arg.as_str() {
            "--count" => {
                let value = raw.next().ok_or_else(|| anyhow::anyhow!(USAGE))?;
                count = value
                    .parse()
                    .with_context(|| format!("--count must be a number, got '{}'", value))?;
            }
            "--seed" => {
                let value = raw.next().ok_or_else(|| anyhow::anyhow!(USAGE))?;
                seed = value
                    .parse()
                    .with_context(|| format!("--seed must be a number, got '{}'", value))?;
            }
            _ if output.is_none() => output = Some(PathBuf::from(arg)),
            _ => return Err(anyhow::anyhow!("Unexpected argument '{}'. {}", arg, USAGE)),
        }
    }

    Ok(Args {
        output: output.ok_or_else(|| anyhow::anyhow!(USAGE))?,
        count,
        seed,
    })
}

fn load_font() -> Result<FontVec> {
    let candidates = [
        "/usr/share/fonts/truetype/dejavu/DejaVuSansMono.ttf",
        "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
        "/System/Library/Fonts/Supplemental/Courier New.ttf",
        "/Library/Fonts/Arial.ttf",
    ];
    let path = candidates
        .iter()
        .map(Path::new)
        .find(|path| path.exists())
        .ok_or_else(|| anyhow::anyhow!("No suitable font found in {:?}", candidates))?;
    let font_data = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    FontVec::try_from_vec(font_data).context("Failed to load font")
}

/// Item rows as printed text: name, quantity and price
fn receipt_lines(rng: &mut StdRng) -> Vec<String> {
    let count = rng.random_range(6..=12);
    (0..count)
        .map(|_| {
            let item = ITEMS[rng.random_range(0..ITEMS.len())];
            let quantity = rng.random_range(1..=5);
            let price = rng.random_range(50..2_000) as f64 / 100.0;
            format!("{:<12} {:>2} x {:>6.2}", item, quantity, price)
        })
        .collect()
}

fn blank_receipt() -> GrayImage {
    GrayImage::from_pixel(RECEIPT_WIDTH, RECEIPT_HEIGHT, Luma([255]))
}

/// Printed header and footer shared by both classes
fn draw_frame(canvas: &mut GrayImage, font: &FontVec, rng: &mut StdRng, total: f64) {
    let shop = SHOPS[rng.random_range(0..SHOPS.len())];
    draw_text_mut(canvas, Luma([0]), 300, 60, PxScale::from(40.0), font, shop);
    draw_text_mut(canvas, Luma([40]), 320, 120, PxScale::from(24.0), font, "Receipt #0042");
    let rule_y = (RECEIPT_HEIGHT as f32) * 0.18;
    draw_line_segment_mut(canvas, (60.0, rule_y), ((RECEIPT_WIDTH - 60) as f32, rule_y), Luma([0]));

    let footer_y = (RECEIPT_HEIGHT as f32 * 0.88) as i32;
    let total = format!("TOTAL {:>10.2}", total);
    draw_text_mut(canvas, Luma([0]), 480, footer_y, PxScale::from(32.0), font, &total);
}

fn render_printed(font: &FontVec, rng: &mut StdRng) -> GrayImage {
    let mut canvas = blank_receipt();
    let lines = receipt_lines(rng);
    let scale = PxScale::from(30.0);
    let top = (RECEIPT_HEIGHT as f32 * 0.24) as i32;
    for (row, line) in lines.iter().enumerate() {
        draw_text_mut(&mut canvas, Luma([0]), 100, top + row as i32 * 52, scale, font, line);
    }
    let total = rng.random_range(10.0..200.0);
    draw_frame(&mut canvas, font, rng, total);
    canvas
}

/// Draw one character with its own size, baseline offset and slant
fn draw_jittered_char(
    canvas: &mut GrayImage,
    font: &FontVec,
    rng: &mut StdRng,
    ch: char,
    x: i32,
    baseline: i32,
) -> i32 {
    let size = rng.random_range(26.0..44.0_f32);
    let scale = PxScale::from(size);
    let text = ch.to_string();
    let (w, _) = text_size(scale, font, &text);

    let cell = (size * 2.0) as u32;
    let mut glyph = GrayImage::from_pixel(cell, cell, Luma([255]));
    let ink = rng.random_range(0..70_u8);
    draw_text_mut(&mut glyph, Luma([ink]), (cell / 4) as i32, (cell / 4) as i32, scale, font, &text);
    let angle = rng.random_range(-0.35..0.35_f32);
    let glyph = rotate_about_center(&glyph, angle, Interpolation::Bilinear, Luma([255]));

    let dy = rng.random_range(-8..=8);
    let origin_x = x - (cell / 4) as i32;
    let origin_y = baseline + dy - (cell / 4) as i32;
    for (gx, gy, pixel) in glyph.enumerate_pixels() {
        let tx = origin_x + gx as i32;
        let ty = origin_y + gy as i32;
        if tx < 0 || ty < 0 || tx >= canvas.width() as i32 || ty >= canvas.height() as i32 {
            continue;
        }
        let target = canvas.get_pixel_mut(tx as u32, ty as u32);
        target[0] = target[0].min(pixel[0]);
    }

    x + w as i32 + rng.random_range(-2..=10)
}

fn render_handwritten(font: &FontVec, rng: &mut StdRng) -> GrayImage {
    let mut canvas = blank_receipt();
    let lines = receipt_lines(rng);
    let top = (RECEIPT_HEIGHT as f32 * 0.24) as i32;
    for (row, line) in lines.iter().enumerate() {
        let mut x = rng.random_range(70..140);
        let baseline = top + row as i32 * 56 + rng.random_range(-6..=6);
        for ch in line.split_whitespace().collect::<Vec<_>>().join(" ").chars() {
            if ch == ' ' {
                x += rng.random_range(12..30);
                continue;
            }
            x = draw_jittered_char(&mut canvas, font, rng, ch, x, baseline);
            if x > RECEIPT_WIDTH as i32 - 80 {
                break;
            }
        }
    }
    let total = rng.random_range(10.0..200.0);
    draw_frame(&mut canvas, font, rng, total);
    canvas
}

fn main() -> Result<()> {
    let args = parse_args(std::env::args().skip(1))?;
    let font = load_font()?;
    let mut rng = StdRng::seed_from_u64(args.seed);

    for model in [RoutingModel::PrintedModel, RoutingModel::HandwrittenModel] {
        let dir = args.output.join(class_directory(model));
        fs::create_dir_all(&dir).with_context(|| format!("Failed to create {}", dir.display()))?;

        println!("Generating {} {} receipts...", args.count, model.label());
        for i in 0..args.count {
            let canvas = match model {
                RoutingModel::PrintedModel => render_printed(&font, &mut rng),
                RoutingModel::HandwrittenModel => render_handwritten(&font, &mut rng),
            };
            let path = dir.join(format!("receipt_{:04}.png", i));
            canvas
                .save(&path)
                .with_context(|| format!("Failed to write {}", path.display()))?;
        }
    }

    println!(
        "Generated {} receipts per class in {}",
        args.count,
        args.output.display()
    );
    println!("Next: cargo run --bin evaluate_accuracy -- {}", args.output.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_args() {
        let args = parse_args(strings(&["out", "--count", "5", "--seed", "7"])).unwrap();
        assert_eq!(
            args,
            Args {
                output: PathBuf::from("out"),
                count: 5,
                seed: 7,
            }
        );
        assert!(parse_args(strings(&["out", "--count", "many"])).is_err());
        assert!(parse_args(strings(&[])).is_err());
    }

    #[test]
    fn test_receipt_lines_are_seeded() {
        let first = receipt_lines(&mut StdRng::seed_from_u64(3));
        let second = receipt_lines(&mut StdRng::seed_from_u64(3));
        assert_eq!(first, second);
        assert!((6..=12).contains(&first.len()));
    }

    #[test]
    fn test_rendering_when_a_font_is_available() {
        // Font availability depends on the host
        let Ok(font) = load_font() else {
            return;
        };
        let mut rng = StdRng::seed_from_u64(1);
        let printed = render_printed(&font, &mut rng);
        let handwritten = render_handwritten(&font, &mut rng);
        assert_eq!(printed.dimensions(), (RECEIPT_WIDTH, RECEIPT_HEIGHT));
        assert!(printed.pixels().any(|p| p[0] < 128));
        assert!(handwritten.pixels().any(|p| p[0] < 128));
    }
}
