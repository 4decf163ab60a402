//! Training configuration

use std::path::{Path, PathBuf};

use face_roi::TrackerProfile;
use inference_engine::ForestConfig;
use serde::{Deserialize, Serialize};
use vitals_pipeline::{load_layered, PipelineConfig, ENV_PREFIX};

/// Training run configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Labeled manifest (`labels.csv`)
    pub manifest_path: PathBuf,
    /// Directory holding `<filename>.<video_extension>`
    pub video_dir: PathBuf,
    pub video_extension: String,
    /// Haar cascade used by the face detector
    pub cascade_path: PathBuf,
    /// Fraction of samples held out for evaluation
    pub test_fraction: f64,
    /// Seed of the train/held-out shuffle
    pub split_seed: u64,
    /// Where the fitted model is written
    pub model_path: PathBuf,
    pub forest: ForestConfig,
    /// Feature extraction settings, batch profile by default
    pub pipeline: PipelineConfig,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            manifest_path: PathBuf::from("training_data/labels.csv"),
            video_dir: PathBuf::from("training_data/videos"),
            video_extension: "mp4".to_string(),
            cascade_path: PathBuf::from("haarcascade_frontalface_default.xml"),
            test_fraction: 0.2,
            split_seed: 42,
            model_path: PathBuf::from("trained_model/vital_signs_model.bin"),
            forest: ForestConfig::default(),
            pipeline: Self::training_pipeline(),
        }
    }
}

impl TrainingConfig {
    /// Batch profile with the detection-ratio gate off: labeled clips where
    /// the face drops out in places still contribute a row.
    fn training_pipeline() -> PipelineConfig {
        let mut pipeline = PipelineConfig::for_profile(TrackerProfile::Batch);
        pipeline.gate.min_detection_ratio = 0.0;
        pipeline
    }

    /// Load defaults, then the optional TOML file, then `VITALS__*` variables
    pub fn load(path: Option<&Path>) -> Result<Self, ::config::ConfigError> {
        load_layered(&Self::default(), path, ENV_PREFIX)
    }
}
