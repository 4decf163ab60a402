//! In-memory frame source

use std::collections::VecDeque;

use crate::frame::VideoFrame;
use crate::{FrameSource, FrameSourceError};

/// Frame source backed by a pre-decoded list of frames.
///
/// Entries may also be recorded as corrupted so that skip policies can be
/// exercised without a real decoder.
pub struct MemoryFrameSource {
    entries: VecDeque<Option<VideoFrame>>,
    fps: f64,
    position: u64,
}

impl MemoryFrameSource {
    /// Create a source from decoded frames
    pub fn new(frames: Vec<VideoFrame>, fps: f64) -> Self {
        Self {
            entries: frames.into_iter().map(Some).collect(),
            fps,
            position: 0,
        }
    }

    /// Build a clip by calling `render` for each frame index
    pub fn from_fn(count: usize, fps: f64, render: impl FnMut(usize) -> VideoFrame) -> Self {
        Self::new((0..count).map(render).collect(), fps)
    }

    /// Append a frame that fails to decode
    pub fn push_corrupt(&mut self) {
        self.entries.push_back(None);
    }

    /// Mark the frame at `index` as corrupted
    pub fn corrupt_at(mut self, index: usize) -> Self {
        if let Some(entry) = self.entries.get_mut(index) {
            *entry = None;
        }
        self
    }

    /// Frames not yet consumed
    pub fn remaining(&self) -> usize {
        self.entries.len()
    }
}

impl FrameSource for MemoryFrameSource {
    fn declared_fps(&self) -> f64 {
        self.fps
    }

    fn next_frame(&mut self) -> Result<Option<VideoFrame>, FrameSourceError> {
        let Some(entry) = self.entries.pop_front() else {
            return Ok(None);
        };
        let index = self.position;
        self.position += 1;

        match entry {
            Some(frame) => Ok(Some(frame)),
            None => Err(FrameSourceError::CorruptFrame {
                index,
                reason: "frame marked corrupt".to_string(),
            }),
        }
    }
}
