//! Pipeline configuration

use std::path::Path;

use face_roi::{TrackerConfig, TrackerProfile};
use frame_source::SourceConfig;
use serde::{Deserialize, Serialize};
use signal_conditioning::{BandpassConfig, GateConfig};
use tracing::debug;

/// Environment prefix for overrides, e.g. `VITALS__GATE__MIN_DETECTION_RATIO`
pub const ENV_PREFIX: &str = "VITALS";

/// Complete measurement configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub source: SourceConfig,
    pub tracker: TrackerConfig,
    pub gate: GateConfig,
    pub bandpass: BandpassConfig,
}

impl PipelineConfig {
    /// Defaults for a tracker profile
    pub fn for_profile(profile: TrackerProfile) -> Self {
        Self {
            tracker: TrackerConfig::for_profile(profile),
            ..Default::default()
        }
    }

    /// Load defaults, then the optional TOML file, then `VITALS__*` variables
    pub fn load(path: Option<&Path>) -> Result<Self, ::config::ConfigError> {
        load_layered(&Self::default(), path, ENV_PREFIX)
    }
}

/// Layer `defaults` <- optional TOML file <- environment under `env_prefix`
pub fn load_layered<T>(defaults: &T, path: Option<&Path>, env_prefix: &str) -> Result<T, ::config::ConfigError>
where
    T: Serialize + serde::de::DeserializeOwned,
{
    let mut builder = ::config::Config::builder().add_source(::config::Config::try_from(defaults)?);

    if let Some(path) = path {
        debug!("Loading configuration from {}", path.display());
        builder = builder.add_source(::config::File::from(path).format(::config::FileFormat::Toml));
    }

    builder
        .add_source(
            ::config::Environment::with_prefix(env_prefix)
                .separator("__")
                .try_parsing(true),
        )
        .build()?
        .try_deserialize()
}
