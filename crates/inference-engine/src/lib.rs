//! Vital Sign Regression
//!
//! Multi-output random forest mapping signal features to systolic pressure,
//! diastolic pressure and heart rate.

mod engine;
mod forest;
mod model;
mod tree;

pub use engine::{VitalsEstimate, VitalsPredictor, VitalsResult};
pub use forest::{ForestConfig, RandomForest};
pub use model::{Regressor, VitalsModel, ARTIFACT_FORMAT_VERSION, TARGET_DIMENSION, TARGET_NAMES};
pub use tree::{RegressionTree, TreeParams};

use thiserror::Error;

/// Errors during model fitting, persistence and inference
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("Model load failed: {0}")]
    ModelLoad(String),
    #[error("Model serialization failed: {0}")]
    Serialization(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Model is not fitted")]
    NotFitted,
    #[error("Inference failed: {0}")]
    InferenceFailed(String),
}
