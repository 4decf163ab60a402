//! Region tracker configuration

use frame_source::ColorChannel;
use serde::{Deserialize, Serialize};

use crate::region::ForeheadOffsets;

/// Processing profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackerProfile {
    /// Full-resolution detection with the tight forehead box
    #[default]
    Interactive,
    /// Downscaled detection with the wide forehead box
    Batch,
}

/// Cascade detector parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CascadeParams {
    /// Image pyramid scale step
    pub scale_factor: f64,
    /// Neighbouring detections required to keep a candidate
    pub min_neighbors: i32,
    /// Smallest face considered (width, height) in pixels
    pub min_size: Option<(i32, i32)>,
}

impl Default for CascadeParams {
    fn default() -> Self {
        Self {
            scale_factor: 1.1,
            min_neighbors: 5,
            min_size: Some((30, 30)),
        }
    }
}

/// Region tracker configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Profile these settings were derived from
    pub profile: TrackerProfile,

    /// Cascade parameters
    pub cascade: CascadeParams,

    /// Forehead box as fractions of the face box
    pub forehead: ForeheadOffsets,

    /// Resize frames to this resolution before detection
    pub detect_resolution: Option<(u32, u32)>,

    /// Channel averaged over the forehead box
    pub channel: ColorChannel,

    /// Skip frames that fail to decode instead of failing the clip
    pub skip_corrupt_frames: bool,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self::interactive()
    }
}

impl TrackerConfig {
    /// High-accuracy settings used for single measurements
    pub fn interactive() -> Self {
        Self {
            profile: TrackerProfile::Interactive,
            cascade: CascadeParams::default(),
            forehead: ForeheadOffsets::TIGHT,
            detect_resolution: None,
            channel: ColorChannel::Green,
            skip_corrupt_frames: false,
        }
    }

    /// Speed-optimized settings used when processing training sets
    pub fn batch() -> Self {
        Self {
            profile: TrackerProfile::Batch,
            cascade: CascadeParams {
                min_size: None,
                ..Default::default()
            },
            forehead: ForeheadOffsets::WIDE,
            detect_resolution: Some((320, 240)),
            channel: ColorChannel::Green,
            skip_corrupt_frames: true,
        }
    }

    /// Settings for a named profile
    pub fn for_profile(profile: TrackerProfile) -> Self {
        match profile {
            TrackerProfile::Interactive => Self::interactive(),
            TrackerProfile::Batch => Self::batch(),
        }
    }
}
