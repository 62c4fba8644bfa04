use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use image::ImageReader;
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use photolift::{DetectionPipeline, PipelineConfig, ScoredCandidate};

#[derive(Parser)]
#[command(name = "photolift")]
#[command(about = "Detect and extract photographs from scans and snapshots")]
struct Cli {
    /// Path to input image file
    #[arg(value_name = "IMAGE")]
    image_path: PathBuf,

    /// Directory the extracted photos are written to
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    out_dir: PathBuf,

    /// Fast mode: detect on the two largest pyramid scales only
    #[arg(long)]
    fast: bool,

    /// Minimum confidence for accepted candidates
    #[arg(long, value_name = "SCORE")]
    min_confidence: Option<f32>,

    /// Disable the texture fallback strategy
    #[arg(long)]
    no_texture_fallback: bool,

    /// Write a JSON report of accepted and rejected candidates
    #[arg(long)]
    report: bool,
}

#[derive(Serialize)]
struct AcceptedEntry<'a> {
    file: String,
    width: u32,
    height: u32,
    #[serde(flatten)]
    candidate: &'a ScoredCandidate,
}

#[derive(Serialize)]
struct Report<'a> {
    source: String,
    accepted: Vec<AcceptedEntry<'a>>,
    rejected: &'a [photolift::RejectedCandidate],
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Cli::parse();

    let image = ImageReader::open(&args.image_path)
        .with_context(|| format!("failed to open {}", args.image_path.display()))?
        .decode()
        .with_context(|| format!("failed to decode {}", args.image_path.display()))?;

    let mut config = PipelineConfig {
        fast_mode: args.fast,
        texture_fallback: !args.no_texture_fallback,
        ..Default::default()
    };
    if let Some(min_confidence) = args.min_confidence {
        config.min_confidence = min_confidence;
    }

    let pipeline = DetectionPipeline::new(config)?;
    let report = pipeline.detect(&image)?;

    if report.is_empty() {
        info!("no photos found in {}", args.image_path.display());
    }

    fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("failed to create {}", args.out_dir.display()))?;

    let stem = args
        .image_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".into());

    let mut accepted = Vec::new();
    for (index, photo) in report.photos.iter().enumerate() {
        let name = format!(
            "{stem}_photo_{:02}_{}_conf{:.2}.png",
            index + 1,
            photo.candidate.candidate.strategy,
            photo.candidate.confidence
        );
        let path = args.out_dir.join(&name);
        photo
            .image
            .save(&path)
            .with_context(|| format!("failed to save {}", path.display()))?;
        info!(
            "saved {} ({}x{}, confidence {:.2})",
            path.display(),
            photo.width,
            photo.height,
            photo.candidate.confidence
        );
        accepted.push(AcceptedEntry {
            file: name,
            width: photo.width,
            height: photo.height,
            candidate: &photo.candidate,
        });
    }

    if args.report {
        let report_path = args.out_dir.join(format!("{stem}_report.json"));
        let payload = Report {
            source: args.image_path.display().to_string(),
            accepted,
            rejected: &report.rejected,
        };
        fs::write(&report_path, serde_json::to_string_pretty(&payload)?)
            .with_context(|| format!("failed to write {}", report_path.display()))?;
        info!("wrote report {}", report_path.display());
    }

    Ok(())
}
