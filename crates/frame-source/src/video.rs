//! Video file frame source using OpenCV.
//!
//! Frames are decoded as BGR by OpenCV and converted to RGB before they are
//! handed out. The capture handle is released when the source is dropped.

use std::path::Path;

use opencv::{
    core::{self, Mat},
    imgproc,
    prelude::*,
    videoio::{self, VideoCapture},
};
use tracing::{debug, info, warn};

use crate::frame::VideoFrame;
use crate::{FrameSource, FrameSourceError};

/// OpenCV-backed video container reader
pub struct OpencvVideoSource {
    capture: VideoCapture,
    fps: f64,
    position: u64,
    path: String,
}

impl OpencvVideoSource {
    /// Open a video file
    pub fn open(path: impl AsRef<Path>) -> Result<Self, FrameSourceError> {
        let path = path.as_ref();
        let path_str = path
            .to_str()
            .ok_or_else(|| FrameSourceError::Open(format!("non UTF-8 path: {}", path.display())))?
            .to_string();

        let capture = VideoCapture::from_file(&path_str, videoio::CAP_ANY)
            .map_err(|e| FrameSourceError::Open(format!("{}: {}", path_str, e)))?;

        let opened = capture
            .is_opened()
            .map_err(|e| FrameSourceError::Open(format!("{}: {}", path_str, e)))?;
        if !opened {
            return Err(FrameSourceError::Open(format!("could not open video file at {}", path_str)));
        }

        let fps = capture.get(videoio::CAP_PROP_FPS).unwrap_or(0.0);
        info!("Opened video {} (declared {:.2} FPS)", path_str, fps);

        Ok(Self {
            capture,
            fps,
            position: 0,
            path: path_str,
        })
    }

    fn convert(&self, bgr: &Mat, index: u64) -> Result<VideoFrame, FrameSourceError> {
        let corrupt = |e: opencv::Error| FrameSourceError::CorruptFrame {
            index,
            reason: e.to_string(),
        };

        let mut rgb = Mat::default();
        imgproc::cvt_color(
            bgr,
            &mut rgb,
            imgproc::COLOR_BGR2RGB,
            0,
            core::AlgorithmHint::ALGO_HINT_DEFAULT,
        )
        .map_err(corrupt)?;

        let width = rgb.cols().max(0) as u32;
        let height = rgb.rows().max(0) as u32;
        let bytes = rgb.data_bytes().map_err(corrupt)?;

        VideoFrame::new(bytes.to_vec(), width, height, index)
    }
}

impl FrameSource for OpencvVideoSource {
    fn declared_fps(&self) -> f64 {
        self.fps
    }

    fn next_frame(&mut self) -> Result<Option<VideoFrame>, FrameSourceError> {
        let mut bgr = Mat::default();
        let got = self
            .capture
            .read(&mut bgr)
            .map_err(|e| FrameSourceError::Decode(format!("{}: {}", self.path, e)))?;

        if !got || bgr.empty() {
            debug!("End of stream for {} after {} frames", self.path, self.position);
            return Ok(None);
        }

        let index = self.position;
        self.position += 1;
        self.convert(&bgr, index).map(Some)
    }
}

impl Drop for OpencvVideoSource {
    fn drop(&mut self) {
        if let Err(e) = self.capture.release() {
            warn!("Failed to release capture for {}: {}", self.path, e);
        }
    }
}
