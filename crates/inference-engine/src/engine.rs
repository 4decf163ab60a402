//! Vital sign prediction from feature vectors

use feature_engine::FeatureVector;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::model::{Regressor, TARGET_NAMES};
use crate::InferenceError;

/// Unrounded model output
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VitalsEstimate {
    pub systolic_bp: f64,
    pub diastolic_bp: f64,
    pub heart_rate: f64,
}

impl VitalsEstimate {
    pub fn from_array(values: [f64; 3]) -> Self {
        Self {
            systolic_bp: values[0],
            diastolic_bp: values[1],
            heart_rate: values[2],
        }
    }

    pub fn to_array(&self) -> [f64; 3] {
        [self.systolic_bp, self.diastolic_bp, self.heart_rate]
    }

    /// Round each value to the nearest integer, ties to even
    pub fn rounded(&self) -> Result<VitalsResult, InferenceError> {
        let mut out = [0i32; 3];
        for (slot, (value, name)) in out.iter_mut().zip(self.to_array().into_iter().zip(TARGET_NAMES)) {
            if !value.is_finite() {
                return Err(InferenceError::InferenceFailed(format!(
                    "non-finite {} estimate: {}",
                    name, value
                )));
            }
            let rounded = value.round_ties_even();
            if rounded < i32::MIN as f64 || rounded > i32::MAX as f64 {
                return Err(InferenceError::InferenceFailed(format!(
                    "{} estimate out of range: {}",
                    name, value
                )));
            }
            *slot = rounded as i32;
        }
        Ok(VitalsResult {
            systolic_bp: out[0],
            diastolic_bp: out[1],
            heart_rate: out[2],
        })
    }
}

/// Integer vital signs reported to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VitalsResult {
    /// mmHg
    pub systolic_bp: i32,
    /// mmHg
    pub diastolic_bp: i32,
    /// Beats per minute
    pub heart_rate: i32,
}

/// Turns feature vectors into rounded vital signs
pub struct VitalsPredictor<R> {
    regressor: R,
}

impl<R: Regressor> VitalsPredictor<R> {
    pub fn new(regressor: R) -> Self {
        Self { regressor }
    }

    pub fn regressor(&self) -> &R {
        &self.regressor
    }

    /// Raw estimate. Non-finite features are rejected before the model runs.
    pub fn estimate(&self, features: &FeatureVector) -> Result<VitalsEstimate, InferenceError> {
        if let Some(bad) = features.as_slice().iter().find(|v| !v.is_finite()) {
            return Err(InferenceError::InvalidInput(format!("non-finite feature value: {}", bad)));
        }
        let estimate = VitalsEstimate::from_array(self.regressor.predict(features)?);
        debug!("Raw estimate: {:?}", estimate);
        Ok(estimate)
    }

    pub fn predict(&self, features: &FeatureVector) -> Result<VitalsResult, InferenceError> {
        self.estimate(features)?.rounded()
    }
}
