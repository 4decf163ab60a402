//! Persisted vitals model

use std::fs;
use std::io::Write;
use std::path::Path;

use feature_engine::{FeatureVector, FEATURE_DIMENSION, FEATURE_NAMES};
use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::forest::{ForestConfig, RandomForest};
use crate::InferenceError;

/// Number of regression targets
pub const TARGET_DIMENSION: usize = 3;

/// Target names in output order
pub const TARGET_NAMES: [&str; TARGET_DIMENSION] = ["systolic_bp", "diastolic_bp", "heart_rate"];

/// Current artifact layout
pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

/// Maps a feature vector to raw `[systolic, diastolic, heart_rate]` estimates
pub trait Regressor {
    fn predict(&self, features: &FeatureVector) -> Result<[f64; TARGET_DIMENSION], InferenceError>;
}

impl<R: Regressor + ?Sized> Regressor for &R {
    fn predict(&self, features: &FeatureVector) -> Result<[f64; TARGET_DIMENSION], InferenceError> {
        (**self).predict(features)
    }
}

impl<R: Regressor + ?Sized> Regressor for Box<R> {
    fn predict(&self, features: &FeatureVector) -> Result<[f64; TARGET_DIMENSION], InferenceError> {
        (**self).predict(features)
    }
}

/// On-disk envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct ModelArtifact {
    format_version: u32,
    feature_names: Vec<String>,
    target_names: Vec<String>,
    forest: RandomForest,
}

/// Trained random forest bound to the vitals feature and target layout
#[derive(Debug, Clone, PartialEq)]
pub struct VitalsModel {
    forest: RandomForest,
}

impl VitalsModel {
    /// Wrap a fitted forest, checking its dimensions
    pub fn from_forest(forest: RandomForest) -> Result<Self, InferenceError> {
        if forest.n_trees() == 0 {
            return Err(InferenceError::NotFitted);
        }
        if forest.n_features() != FEATURE_DIMENSION || forest.n_targets() != TARGET_DIMENSION {
            return Err(InferenceError::InvalidInput(format!(
                "forest maps {} features to {} targets, expected {} to {}",
                forest.n_features(),
                forest.n_targets(),
                FEATURE_DIMENSION,
                TARGET_DIMENSION
            )));
        }
        Ok(Self { forest })
    }

    /// Fit a new model on feature rows `x` and target rows `y`
    pub fn fit(
        x: ArrayView2<f64>,
        y: ArrayView2<f64>,
        config: &ForestConfig,
    ) -> Result<Self, InferenceError> {
        Self::from_forest(RandomForest::fit(x, y, config)?)
    }

    pub fn forest(&self) -> &RandomForest {
        &self.forest
    }

    /// Load a model artifact.
    ///
    /// A missing file is reported as a load failure rather than an I/O error.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, InferenceError> {
        let path = path.as_ref();
        info!("Loading vitals model from {}", path.display());

        let bytes = fs::read(path)
            .map_err(|e| InferenceError::ModelLoad(format!("{}: {}", path.display(), e)))?;
        let artifact: ModelArtifact = postcard::from_bytes(&bytes)
            .map_err(|e| InferenceError::Serialization(e.to_string()))?;

        if artifact.format_version != ARTIFACT_FORMAT_VERSION {
            return Err(InferenceError::ModelLoad(format!(
                "unsupported artifact version {} (expected {})",
                artifact.format_version, ARTIFACT_FORMAT_VERSION
            )));
        }
        if artifact.feature_names != FEATURE_NAMES || artifact.target_names != TARGET_NAMES {
            return Err(InferenceError::ModelLoad(format!(
                "artifact layout {:?} -> {:?} does not match {:?} -> {:?}",
                artifact.feature_names, artifact.target_names, FEATURE_NAMES, TARGET_NAMES
            )));
        }

        let model = Self::from_forest(artifact.forest)?;
        debug!("Loaded forest with {} trees", model.forest.n_trees());
        Ok(model)
    }

    /// Write the model artifact, creating parent directories as needed.
    ///
    /// The artifact is written to a uniquely named temp file in the target
    /// directory and renamed into place.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), InferenceError> {
        let path = path.as_ref();
        let parent = match path.parent().filter(|p| !p.as_os_str().is_empty()) {
            Some(parent) => parent,
            None => Path::new("."),
        };
        fs::create_dir_all(parent)?;

        let artifact = ModelArtifact {
            format_version: ARTIFACT_FORMAT_VERSION,
            feature_names: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
            target_names: TARGET_NAMES.iter().map(|s| s.to_string()).collect(),
            forest: self.forest.clone(),
        };
        let bytes =
            postcard::to_allocvec(&artifact).map_err(|e| InferenceError::Serialization(e.to_string()))?;

        let mut tmp = NamedTempFile::new_in(parent)?;
        tmp.write_all(&bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| InferenceError::Io(e.error))?;

        info!("Saved vitals model ({} bytes) to {}", bytes.len(), path.display());
        Ok(())
    }
}

impl Regressor for VitalsModel {
    fn predict(&self, features: &FeatureVector) -> Result<[f64; TARGET_DIMENSION], InferenceError> {
        let out = self.forest.predict(features.as_slice())?;
        let mut estimate = [0.0; TARGET_DIMENSION];
        estimate.copy_from_slice(&out);
        Ok(estimate)
    }
}
