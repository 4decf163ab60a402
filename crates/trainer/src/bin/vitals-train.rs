//! Train the vitals regression model from a labeled video set

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use face_roi::CascadeFaceDetector;
use tracing::{info, Level};
use trainer::{OpencvOpener, Trainer, TrainingConfig};

#[derive(Parser, Debug)]
#[command(name = "vitals-train", version, about = "Fit the vital signs model on labeled face videos")]
struct Args {
    /// TOML configuration file
    #[arg(long, env = "VITALS_CONFIG")]
    config: Option<PathBuf>,

    /// Labeled manifest (labels.csv)
    #[arg(long)]
    manifest: Option<PathBuf>,

    /// Directory of training videos
    #[arg(long)]
    videos: Option<PathBuf>,

    /// Model artifact output path
    #[arg(long)]
    output: Option<PathBuf>,

    /// Haar cascade file
    #[arg(long)]
    cascade: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    vitals_pipeline::init_logging(if args.verbose { Level::DEBUG } else { Level::INFO })
        .context("failed to install log subscriber")?;

    info!("=== vitals-train v{} ===", env!("CARGO_PKG_VERSION"));

    let mut config = TrainingConfig::load(args.config.as_deref()).context("failed to load configuration")?;
    if let Some(manifest) = args.manifest {
        config.manifest_path = manifest;
    }
    if let Some(videos) = args.videos {
        config.video_dir = videos;
    }
    if let Some(output) = args.output {
        config.model_path = output;
    }
    if let Some(cascade) = args.cascade {
        config.cascade_path = cascade;
    }

    let detector = CascadeFaceDetector::load(&config.cascade_path)
        .with_context(|| format!("failed to load cascade {}", config.cascade_path.display()))?;

    let report = Trainer::new(config, detector, OpencvOpener).run()?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
