//! Raw Signal Quality Gate

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::GateRejection;

/// Gate configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateConfig {
    /// Minimum fraction of frames with a detected region
    pub min_detection_ratio: f64,
    /// Minimum raw series length
    pub min_samples: usize,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            min_detection_ratio: 0.8,
            min_samples: 20,
        }
    }
}

/// Accepts or rejects a raw series before filtering
#[derive(Debug, Clone, Default)]
pub struct SignalGate {
    config: GateConfig,
}

impl SignalGate {
    pub fn new(config: GateConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// Check the detection ratio. An undefined ratio (no frames) passes here
    /// and is caught by the length check.
    pub fn check_detection(&self, ratio: Option<f64>) -> Result<(), GateRejection> {
        match ratio {
            Some(ratio) if ratio < self.config.min_detection_ratio => Err(GateRejection::LowDetectionRatio {
                ratio,
                min: self.config.min_detection_ratio,
            }),
            _ => Ok(()),
        }
    }

    /// Check the series length
    pub fn check_length(&self, len: usize) -> Result<(), GateRejection> {
        if len < self.config.min_samples {
            return Err(GateRejection::InsufficientLength {
                len,
                min: self.config.min_samples,
            });
        }
        Ok(())
    }

    /// Run both checks, detection ratio first
    pub fn check(&self, ratio: Option<f64>, len: usize) -> Result<(), GateRejection> {
        self.check_detection(ratio)?;
        self.check_length(len)?;
        debug!("Signal accepted: ratio={:?}, len={}", ratio, len);
        Ok(())
    }
}
