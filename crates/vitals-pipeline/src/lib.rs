//! Vital Signs Pipeline
//!
//! Face video to blood pressure and heart rate:
//! Frame Source -> Region Tracker -> Raw Signal -> Bandpass -> Features -> Model

pub mod config;
pub mod error;
pub mod pipeline;

pub use config::{load_layered, PipelineConfig, ENV_PREFIX};
pub use error::{PipelineError, RejectionReason};
pub use inference_engine::VitalsResult;
pub use pipeline::{ExtractedFeatures, FeaturePipeline, Measurement, MeasurementDiagnostics, VitalsPipeline};

use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Install the process-wide log subscriber
pub fn init_logging(level: Level) -> Result<(), tracing::subscriber::SetGlobalDefaultError> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
}
