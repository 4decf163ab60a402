//! Feature Engineering Engine
//!
//! Reduces a filtered iPPG signal to the fixed feature vector consumed by the
//! regression model, plus spectral diagnostics that are reported but never
//! fed to the model.

mod features;
mod fft;
mod statistics;

pub use features::{FeatureExtractor, FeatureVector, FEATURE_DIMENSION, FEATURE_NAMES};
pub use fft::{SpectralFeatures, SpectrumAnalyzer};
pub use statistics::StatisticalFeatures;
