//! Conditioning Error Types

use thiserror::Error;

/// Errors during filter design or application
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FilterError {
    /// Input series shorter than the configured minimum
    #[error("Signal too short: {len} samples, need at least {min}")]
    TooShort { len: usize, min: usize },

    /// Sampling rate does not exceed twice the upper cutoff
    #[error("Sampling rate {fs} Hz is too low for an upper cutoff of {high_cutoff} Hz")]
    SamplingRateTooLow { fs: f64, high_cutoff: f64 },

    /// Cutoffs are not ordered within (0, Nyquist)
    #[error("Invalid cutoffs [{low}, {high}] Hz at {fs} Hz sampling")]
    InvalidCutoffs { low: f64, high: f64, fs: f64 },

    /// Numerical failure while designing or applying the filter
    #[error("Numerical failure: {0}")]
    Numerical(String),
}

/// Reasons a raw series is rejected before filtering
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum GateRejection {
    /// Region found in too few frames
    #[error("Detection ratio {ratio:.3} below {min:.3}")]
    LowDetectionRatio { ratio: f64, min: f64 },

    /// Not enough samples to filter
    #[error("Signal length {len} below {min}")]
    InsufficientLength { len: usize, min: usize },
}
