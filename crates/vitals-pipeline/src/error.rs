//! Pipeline error types

use std::fmt;

use face_roi::{DetectError, SignalBuildError};
use inference_engine::InferenceError;
use serde::{Deserialize, Serialize};
use signal_conditioning::{FilterError, GateRejection};
use thiserror::Error;

/// Why a clip was refused. Each reason asks the user for a different fix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RejectionReason {
    /// Face found in too few frames
    InsufficientDetectionConsistency,
    /// Too few samples to filter
    InsufficientSignalLength,
    /// Frame rate not above twice the upper cutoff
    SamplingRateTooLow,
    /// Filter design or application failed
    FilterFailure,
}

impl RejectionReason {
    pub fn code(&self) -> &'static str {
        match self {
            Self::InsufficientDetectionConsistency => "insufficient-detection-consistency",
            Self::InsufficientSignalLength => "insufficient-signal-length",
            Self::SamplingRateTooLow => "sampling-rate-too-low",
            Self::FilterFailure => "filter-failure",
        }
    }
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl From<GateRejection> for RejectionReason {
    fn from(rejection: GateRejection) -> Self {
        match rejection {
            GateRejection::LowDetectionRatio { .. } => Self::InsufficientDetectionConsistency,
            GateRejection::InsufficientLength { .. } => Self::InsufficientSignalLength,
        }
    }
}

impl From<&FilterError> for RejectionReason {
    fn from(error: &FilterError) -> Self {
        match error {
            FilterError::TooShort { .. } => Self::InsufficientSignalLength,
            FilterError::SamplingRateTooLow { .. } => Self::SamplingRateTooLow,
            FilterError::InvalidCutoffs { .. } | FilterError::Numerical(_) => Self::FilterFailure,
        }
    }
}

/// Measurement errors
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Measurement rejected: {0}")]
    Rejected(RejectionReason),

    #[error("Unreadable input: {0}")]
    UnreadableInput(String),

    #[error("Face detection failed: {0}")]
    Detection(#[from] DetectError),

    #[error("Inference failed: {0}")]
    Inference(#[from] InferenceError),
}

impl PipelineError {
    /// Rejection code for request-level rejections
    pub fn reason_code(&self) -> Option<&'static str> {
        match self {
            Self::Rejected(reason) => Some(reason.code()),
            _ => None,
        }
    }

    pub fn rejection(&self) -> Option<RejectionReason> {
        match self {
            Self::Rejected(reason) => Some(*reason),
            _ => None,
        }
    }
}

impl From<RejectionReason> for PipelineError {
    fn from(reason: RejectionReason) -> Self {
        Self::Rejected(reason)
    }
}

impl From<SignalBuildError> for PipelineError {
    fn from(error: SignalBuildError) -> Self {
        match error {
            SignalBuildError::Source(e) => Self::UnreadableInput(e.to_string()),
            SignalBuildError::Detection(e) => Self::Detection(e),
        }
    }
}
