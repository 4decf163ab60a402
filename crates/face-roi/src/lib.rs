//! Face Region Tracking for iPPG
//!
//! Per-frame skin region selection and raw signal construction:
//! - Frontal face detection (cascade backend behind `opencv`)
//! - Largest-face selection
//! - Forehead box derivation from fixed fractional offsets
//! - Raw green-channel time series with detection statistics

pub mod config;
pub mod detector;
pub mod region;
pub mod signal;

pub use config::{CascadeParams, TrackerConfig, TrackerProfile};
pub use detector::FaceDetector;
#[cfg(feature = "opencv")]
pub use detector::{CascadeFaceDetector, FRONTAL_FACE_CASCADE};
pub use region::{select_largest, FaceBox, ForeheadOffsets, Region};
pub use signal::{DetectionStats, RawSignal, RawSignalBuilder, SignalBuildError};

use std::borrow::Cow;

use frame_source::{ColorChannel, VideoFrame};
use thiserror::Error;
use tracing::trace;

/// Detection error types
#[derive(Error, Debug)]
pub enum DetectError {
    #[error("Detector loading failed: {0}")]
    ModelLoad(String),

    #[error("Detection failed: {0}")]
    Detection(String),
}

/// Forehead region located in a frame.
///
/// The region is expressed in the coordinates of `frame`, which is the
/// resized copy when the profile detects at a fixed resolution.
pub struct TrackedRegion<'a> {
    pub region: Region,
    pub frame: Cow<'a, VideoFrame>,
}

impl TrackedRegion<'_> {
    /// Mean of `channel` over the region
    pub fn channel_mean(&self, channel: ColorChannel) -> Option<f64> {
        self.frame.channel_mean(
            self.region.x as i64,
            self.region.y as i64,
            self.region.width as i64,
            self.region.height as i64,
            channel,
        )
    }
}

/// Region tracker: zero or one forehead region per frame
pub struct RegionTracker<D> {
    config: TrackerConfig,
    detector: D,
}

impl<D: FaceDetector> RegionTracker<D> {
    /// Create a tracker around a loaded detector
    pub fn new(config: TrackerConfig, detector: D) -> Self {
        Self { config, detector }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Locate the forehead region of the largest face in `frame`
    pub fn locate<'a>(&mut self, frame: &'a VideoFrame) -> Result<Option<TrackedRegion<'a>>, DetectError> {
        let working = match self.config.detect_resolution {
            Some((w, h)) if (w, h) != (frame.width, frame.height) => Cow::Owned(frame.resize(w, h)),
            _ => Cow::Borrowed(frame),
        };

        let faces = self.detector.detect(&working, &self.config.cascade)?;
        let Some(face) = select_largest(&faces) else {
            trace!("Frame {}: no face", frame.sequence);
            return Ok(None);
        };

        let region = self
            .config
            .forehead
            .derive(face)
            .clip(working.width, working.height);

        trace!("Frame {}: {} candidates, forehead {:?}", frame.sequence, faces.len(), region);
        Ok(region.map(|region| TrackedRegion { region, frame: working }))
    }

    /// Release the detector
    pub fn into_detector(self) -> D {
        self.detector
    }
}
