//! Labeled training manifest

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::TrainingError;

/// One row of `labels.csv`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelRecord {
    /// Sample id, also the video file stem
    pub filename: String,
    pub systolic_bp: f64,
    pub diastolic_bp: f64,
    pub heart_rate: f64,
}

impl LabelRecord {
    /// Labels in model target order
    pub fn targets(&self) -> [f64; 3] {
        [self.systolic_bp, self.diastolic_bp, self.heart_rate]
    }

    /// `<video_dir>/<filename>.<extension>`
    pub fn video_path(&self, video_dir: &Path, extension: &str) -> PathBuf {
        let mut name = self.filename.clone();
        if !extension.is_empty() {
            name.push('.');
            name.push_str(extension);
        }
        video_dir.join(name)
    }
}

/// Read every record of a manifest. A missing file is fatal.
pub fn load_manifest(path: &Path) -> Result<Vec<LabelRecord>, TrainingError> {
    if !path.is_file() {
        return Err(TrainingError::ManifestMissing(path.to_path_buf()));
    }

    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_path(path)?;
    let records = reader
        .deserialize()
        .collect::<Result<Vec<LabelRecord>, csv::Error>>()?;

    info!("Loaded {} labeled entries from {}", records.len(), path.display());
    Ok(records)
}
