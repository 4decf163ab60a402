//! Vitals Model Training
//!
//! Batch feature extraction over a labeled video set, seeded 80/20 split,
//! multi-output random forest fit, per-target held-out error, model artifact.

pub mod config;
pub mod manifest;
pub mod metrics;
pub mod split;
pub mod trainer;

pub use config::TrainingConfig;
pub use manifest::{load_manifest, LabelRecord};
pub use metrics::{mean_absolute_error, TargetErrors};
pub use split::{train_test_split, Split};
#[cfg(feature = "opencv")]
pub use trainer::OpencvOpener;
pub use trainer::{SkipReason, SkippedEntry, Trainer, TrainingReport, TrainingSet, VideoOpener};

use std::path::PathBuf;

use inference_engine::InferenceError;
use thiserror::Error;

/// Fatal training errors. Per-entry failures are skipped, not raised.
#[derive(Error, Debug)]
pub enum TrainingError {
    #[error("Manifest not found: {0}")]
    ManifestMissing(PathBuf),

    #[error("Manifest parse failed: {0}")]
    Manifest(#[from] csv::Error),

    #[error("No valid training samples ({skipped} entries skipped)")]
    NoValidSamples { skipped: usize },

    #[error("Model error: {0}")]
    Model(#[from] InferenceError),
}
