//! Feature Vector Assembly

use crate::statistics::StatisticalFeatures;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Number of features in the vector
pub const FEATURE_DIMENSION: usize = 5;

/// Feature names in vector order. The order is part of the model input
/// contract and must not change between training and inference.
pub const FEATURE_NAMES: [&str; FEATURE_DIMENSION] = ["mean", "std", "min", "max", "ptp"];

/// Feature vector for the regression model
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    /// [mean, std, min, max, ptp]
    pub values: [f64; FEATURE_DIMENSION],
}

impl FeatureVector {
    pub fn new(values: [f64; FEATURE_DIMENSION]) -> Self {
        Self { values }
    }

    pub fn mean(&self) -> f64 {
        self.values[0]
    }

    pub fn std_dev(&self) -> f64 {
        self.values[1]
    }

    pub fn min(&self) -> f64 {
        self.values[2]
    }

    pub fn max(&self) -> f64 {
        self.values[3]
    }

    pub fn peak_to_peak(&self) -> f64 {
        self.values[4]
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }
}

impl From<StatisticalFeatures> for FeatureVector {
    fn from(stats: StatisticalFeatures) -> Self {
        Self::new([stats.mean, stats.std_dev, stats.min, stats.max, stats.peak_to_peak])
    }
}

/// Feature extractor for filtered signals
#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureExtractor;

impl FeatureExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Extract features. Absent or empty input yields no features.
    pub fn extract(&self, signal: Option<&[f64]>) -> Option<FeatureVector> {
        let signal = signal?;
        let stats = StatisticalFeatures::compute(signal)?;
        let features = FeatureVector::from(stats);
        debug!("Extracted features {:?} from {} samples", features.values, signal.len());
        Some(features)
    }
}
