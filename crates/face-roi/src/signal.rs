//! Raw iPPG time series construction

use frame_source::{FrameSource, FrameSourceError};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::detector::FaceDetector;
use crate::{DetectError, RegionTracker};

/// Value recorded for a frame without a usable region
pub const NO_REGION_SENTINEL: f64 = 0.0;

/// Errors while building a raw signal
#[derive(Error, Debug)]
pub enum SignalBuildError {
    #[error("Frame source failed: {0}")]
    Source(#[from] FrameSourceError),

    #[error("Face detection failed: {0}")]
    Detection(#[from] DetectError),
}

/// Per-clip detection counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionStats {
    /// Frames that were decoded and examined
    pub total_frames: usize,
    /// Frames with a non-empty forehead region
    pub detected_frames: usize,
    /// Corrupted frames skipped without being counted
    pub skipped_frames: usize,
}

impl DetectionStats {
    /// Fraction of examined frames with a region, `None` if no frame was examined
    pub fn ratio(&self) -> Option<f64> {
        if self.total_frames == 0 {
            return None;
        }
        Some(self.detected_frames as f64 / self.total_frames as f64)
    }
}

/// One scalar per examined frame, index-aligned with frame order
#[derive(Debug, Clone, Default)]
pub struct RawSignal {
    pub samples: Vec<f64>,
    pub stats: DetectionStats,
    /// Frame rate declared by the source container
    pub declared_fps: f64,
}

impl RawSignal {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Builds a raw signal by running the region tracker over every frame
pub struct RawSignalBuilder<'t, D> {
    tracker: &'t mut RegionTracker<D>,
}

impl<'t, D: FaceDetector> RawSignalBuilder<'t, D> {
    pub fn new(tracker: &'t mut RegionTracker<D>) -> Self {
        Self { tracker }
    }

    /// Consume `source` to the end of the stream.
    ///
    /// The source is taken by value and dropped before this returns, on
    /// success and on error alike.
    pub fn build<S: FrameSource>(self, mut source: S) -> Result<RawSignal, SignalBuildError> {
        let channel = self.tracker.config().channel;
        let skip_corrupt = self.tracker.config().skip_corrupt_frames;

        let mut signal = RawSignal {
            declared_fps: source.declared_fps(),
            ..Default::default()
        };

        loop {
            let frame = match source.next_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => break,
                Err(e) if skip_corrupt && e.is_recoverable() => {
                    debug!("Skipping frame: {}", e);
                    signal.stats.skipped_frames += 1;
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            signal.stats.total_frames += 1;

            let value = match self.tracker.locate(&frame)? {
                Some(tracked) => match tracked.channel_mean(channel) {
                    Some(mean) => {
                        signal.stats.detected_frames += 1;
                        mean
                    }
                    None => NO_REGION_SENTINEL,
                },
                None => NO_REGION_SENTINEL,
            };
            signal.samples.push(value);
        }

        drop(source);

        info!(
            "Raw signal built: {} samples, {}/{} frames with region, {} skipped",
            signal.samples.len(),
            signal.stats.detected_frames,
            signal.stats.total_frames,
            signal.stats.skipped_frames
        );
        Ok(signal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::FaceBox;
    use crate::testing::ScriptedDetector;
    use crate::TrackerConfig;
    use frame_source::{MemoryFrameSource, VideoFrame};

    fn face() -> Vec<FaceBox> {
        vec![FaceBox::new(20, 20, 80, 80)]
    }

    #[test]
    fn test_constant_region_content() {
        let mut script = vec![face(); 10];
        script[3] = vec![];
        script[7] = vec![];
        let mut tracker = RegionTracker::new(TrackerConfig::interactive(), ScriptedDetector::new(script));

        let source = MemoryFrameSource::from_fn(10, 30.0, |i| VideoFrame::filled(160, 120, [5, 90, 5], i as u64));
        let signal = RawSignalBuilder::new(&mut tracker).build(source).unwrap();

        assert_eq!(signal.len(), 10);
        assert_eq!(signal.stats.total_frames, 10);
        assert_eq!(signal.stats.detected_frames, 8);
        assert_eq!(signal.stats.ratio(), Some(0.8));
        assert_eq!(signal.samples[3], NO_REGION_SENTINEL);
        assert_eq!(signal.samples[0], 90.0);
        assert_eq!(signal.declared_fps, 30.0);
    }

    #[test]
    fn test_batch_profile_skips_corrupt_frames() {
        let mut tracker = RegionTracker::new(TrackerConfig::batch(), ScriptedDetector::new(vec![face()]));
        let source = MemoryFrameSource::from_fn(6, 25.0, |i| VideoFrame::filled(320, 240, [0, 40, 0], i as u64))
            .corrupt_at(2)
            .corrupt_at(4);

        let signal = RawSignalBuilder::new(&mut tracker).build(source).unwrap();
        assert_eq!(signal.len(), 4);
        assert_eq!(signal.stats.total_frames, 4);
        assert_eq!(signal.stats.skipped_frames, 2);
        assert_eq!(signal.stats.ratio(), Some(1.0));
    }

    #[test]
    fn test_interactive_profile_fails_on_corrupt_frame() {
        let mut tracker = RegionTracker::new(TrackerConfig::interactive(), ScriptedDetector::new(vec![face()]));
        let source =
            MemoryFrameSource::from_fn(4, 30.0, |i| VideoFrame::filled(160, 120, [0, 40, 0], i as u64)).corrupt_at(1);

        let err = RawSignalBuilder::new(&mut tracker).build(source).unwrap_err();
        assert!(matches!(err, SignalBuildError::Source(FrameSourceError::CorruptFrame { .. })));
    }

    #[test]
    fn test_empty_clip() {
        let mut tracker = RegionTracker::new(TrackerConfig::interactive(), ScriptedDetector::new(vec![face()]));
        let signal = RawSignalBuilder::new(&mut tracker)
            .build(MemoryFrameSource::new(vec![], 30.0))
            .unwrap();
        assert!(signal.is_empty());
        assert_eq!(signal.stats.ratio(), None);
    }
}
