//! Signal Conditioning
//!
//! Quality gating and cardiac-band filtering for raw iPPG series.

mod error;
mod filter;
mod gate;

pub use error::{FilterError, GateRejection};
pub use filter::{
    filtfilt, lfilter, BandpassConfig, BandpassFilter, FilterCoefficients, DEFAULT_MIN_SAMPLES,
};
pub use gate::{GateConfig, SignalGate};
