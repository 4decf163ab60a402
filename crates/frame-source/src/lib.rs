//! Frame Source Library for Face-Video Vital Signs
//!
//! Opens an already-captured clip and yields its frames in order, together
//! with the frame rate the container declares.
//! Supports:
//! - In-memory frame lists (synthetic clips, tests)
//! - Directories of still images decoded with `image`
//! - Video containers decoded through OpenCV (`opencv` feature)

pub mod frame;
pub mod image_sequence;
pub mod memory;
#[cfg(feature = "opencv")]
pub mod video;

pub use frame::{ColorChannel, VideoFrame};
pub use image_sequence::ImageSequenceSource;
pub use memory::MemoryFrameSource;
#[cfg(feature = "opencv")]
pub use video::OpencvVideoSource;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Frame source error types
#[derive(Error, Debug)]
pub enum FrameSourceError {
    #[error("Failed to open video source: {0}")]
    Open(String),

    #[error("Decode failed: {0}")]
    Decode(String),

    /// A single frame could not be decoded or converted. The stream itself
    /// is still usable and the next call may succeed.
    #[error("Corrupted frame {index}: {reason}")]
    CorruptFrame { index: u64, reason: String },

    #[error("Invalid frame format: {0}")]
    Format(String),
}

impl FrameSourceError {
    /// Whether reading may continue after this error
    pub fn is_recoverable(&self) -> bool {
        matches!(self, FrameSourceError::CorruptFrame { .. })
    }
}

/// An ordered, finite sequence of decoded frames.
///
/// Implementations own the underlying media handle and must release it
/// when dropped.
pub trait FrameSource {
    /// Frame rate reported by the container. May be `0.0` or non-finite when
    /// the container does not report one.
    fn declared_fps(&self) -> f64;

    /// Decode the next frame. `Ok(None)` marks the end of the stream.
    fn next_frame(&mut self) -> Result<Option<VideoFrame>, FrameSourceError>;
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn declared_fps(&self) -> f64 {
        (**self).declared_fps()
    }

    fn next_frame(&mut self) -> Result<Option<VideoFrame>, FrameSourceError> {
        (**self).next_frame()
    }
}

/// Frame rate used when neither the caller nor the container provides one
pub const DEFAULT_FPS: f64 = 30.0;

/// Source configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Frame rate substituted for an unreported or zero rate
    pub default_fps: f64,
    /// Caller-supplied frame rate that takes precedence over the container
    pub fps_override: Option<f64>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            default_fps: DEFAULT_FPS,
            fps_override: None,
        }
    }
}

impl SourceConfig {
    /// Resolve the sampling rate for a clip whose container declares `declared`
    pub fn effective_fps(&self, declared: f64) -> f64 {
        let usable = |fps: f64| fps.is_finite() && fps > 0.0;

        match self.fps_override {
            Some(fps) if usable(fps) => fps,
            _ if usable(declared) => declared,
            _ => self.default_fps,
        }
    }
}
