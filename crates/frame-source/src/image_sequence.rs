//! Still-image sequence source
//!
//! Treats a directory of numbered frames (`frame_0001.png`, ...) as a clip.
//! Files are ordered by name; the sequence carries no frame rate of its own.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::frame::VideoFrame;
use crate::{FrameSource, FrameSourceError};

const FRAME_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "bmp"];

/// Frame source reading one image file per frame
pub struct ImageSequenceSource {
    paths: Vec<PathBuf>,
    next: usize,
    fps: f64,
}

impl ImageSequenceSource {
    /// Open a directory of frames. `fps` is reported as the declared rate;
    /// pass `0.0` to let the caller's default apply.
    pub fn open(dir: impl AsRef<Path>, fps: f64) -> Result<Self, FrameSourceError> {
        let dir = dir.as_ref();
        let entries = std::fs::read_dir(dir)
            .map_err(|e| FrameSourceError::Open(format!("{}: {}", dir.display(), e)))?;

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .map(|ext| FRAME_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
                    .unwrap_or(false)
            })
            .collect();
        paths.sort();

        if paths.is_empty() {
            return Err(FrameSourceError::Open(format!(
                "{}: no image frames found",
                dir.display()
            )));
        }

        info!("Opened image sequence {} ({} frames)", dir.display(), paths.len());
        Ok(Self { paths, next: 0, fps })
    }

    /// Number of frame files in the sequence
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

impl FrameSource for ImageSequenceSource {
    fn declared_fps(&self) -> f64 {
        self.fps
    }

    fn next_frame(&mut self) -> Result<Option<VideoFrame>, FrameSourceError> {
        let Some(path) = self.paths.get(self.next) else {
            return Ok(None);
        };
        let index = self.next as u64;
        self.next += 1;

        let img = image::open(path).map_err(|e| {
            debug!("Failed to decode {}: {}", path.display(), e);
            FrameSourceError::CorruptFrame {
                index,
                reason: e.to_string(),
            }
        })?;

        Ok(Some(VideoFrame::from_image(img.to_rgb8(), index)))
    }
}
