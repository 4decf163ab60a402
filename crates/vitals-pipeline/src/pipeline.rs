//! Measurement pipeline

use face_roi::{FaceDetector, RawSignalBuilder, RegionTracker};
use feature_engine::{FeatureExtractor, FeatureVector, SpectrumAnalyzer};
use frame_source::{FrameSource, SourceConfig};
use inference_engine::{Regressor, VitalsPredictor, VitalsResult};
use serde::{Deserialize, Serialize};
use signal_conditioning::{BandpassFilter, SignalGate};
use tracing::{debug, info, warn};

use crate::config::PipelineConfig;
use crate::error::{PipelineError, RejectionReason};

/// Per-clip signal diagnostics. Reported to callers, never fed to the model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MeasurementDiagnostics {
    /// Fraction of frames with a forehead region
    pub detection_ratio: f64,
    /// Raw series length
    pub sample_count: usize,
    /// Frames skipped as corrupt
    pub skipped_frames: usize,
    /// Sampling rate used for filtering (Hz)
    pub frame_rate: f64,
    /// Strongest in-band frequency of the filtered signal (Hz)
    pub dominant_frequency_hz: Option<f64>,
}

/// Features of one accepted clip
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExtractedFeatures {
    pub features: FeatureVector,
    pub diagnostics: MeasurementDiagnostics,
}

/// Accepted measurement
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub vitals: VitalsResult,
    pub diagnostics: MeasurementDiagnostics,
}

/// Frame source to feature vector: tracking, gating, filtering, extraction.
///
/// Shared by the measurement path and by training.
pub struct FeaturePipeline<D> {
    source: SourceConfig,
    tracker: RegionTracker<D>,
    gate: SignalGate,
    filter: BandpassFilter,
    extractor: FeatureExtractor,
    spectrum: SpectrumAnalyzer,
}

impl<D: FaceDetector> FeaturePipeline<D> {
    pub fn new(config: &PipelineConfig, detector: D) -> Self {
        let band = (config.bandpass.low_cutoff_hz, config.bandpass.high_cutoff_hz);
        Self {
            source: config.source.clone(),
            tracker: RegionTracker::new(config.tracker.clone(), detector),
            gate: SignalGate::new(config.gate.clone()),
            filter: BandpassFilter::new(config.bandpass.clone())
                .with_min_samples(config.gate.min_samples),
            extractor: FeatureExtractor::new(),
            spectrum: SpectrumAnalyzer::new(band),
        }
    }

    /// Run one clip through the chain.
    ///
    /// `source` is consumed and closed before any gate is evaluated, so the
    /// underlying media handle is released on every return path.
    pub fn extract<S: FrameSource>(&mut self, source: S) -> Result<ExtractedFeatures, PipelineError> {
        let raw = RawSignalBuilder::new(&mut self.tracker).build(source)?;
        let frame_rate = self.source.effective_fps(raw.declared_fps);
        let ratio = raw.stats.ratio();

        self.gate.check_detection(ratio).map_err(|rejection| {
            warn!("Clip rejected: {}", rejection);
            RejectionReason::from(rejection)
        })?;
        self.gate.check_length(raw.len()).map_err(|rejection| {
            warn!("Clip rejected: {}", rejection);
            RejectionReason::from(rejection)
        })?;

        self.filter.check_sampling_rate(frame_rate).map_err(|e| {
            warn!("Clip rejected: {}", e);
            RejectionReason::from(&e)
        })?;
        let filtered = self.filter.apply(&raw.samples, frame_rate).map_err(|e| {
            warn!("Filtering failed: {}", e);
            RejectionReason::from(&e)
        })?;

        let features = self
            .extractor
            .extract(Some(&filtered))
            .ok_or(RejectionReason::FilterFailure)?;

        let dominant_frequency_hz = self
            .spectrum
            .analyze(&filtered, frame_rate)
            .map(|s| s.dominant_frequency_hz);

        let diagnostics = MeasurementDiagnostics {
            detection_ratio: ratio.unwrap_or(0.0),
            sample_count: raw.len(),
            skipped_frames: raw.stats.skipped_frames,
            frame_rate,
            dominant_frequency_hz,
        };
        debug!("Clip diagnostics: {:?}", diagnostics);

        Ok(ExtractedFeatures { features, diagnostics })
    }

    /// Open a video file and run it through the chain
    #[cfg(feature = "opencv")]
    pub fn extract_file<P: AsRef<std::path::Path>>(&mut self, path: P) -> Result<ExtractedFeatures, PipelineError> {
        let source = frame_source::OpencvVideoSource::open(path)
            .map_err(|e| PipelineError::UnreadableInput(e.to_string()))?;
        self.extract(source)
    }

    pub fn into_detector(self) -> D {
        self.tracker.into_detector()
    }
}

/// Face video to rounded vital signs.
///
/// Holds the detector and regressor handles for its lifetime; each call to
/// [`measure`](Self::measure) is independent of previous calls.
pub struct VitalsPipeline<D, R> {
    features: FeaturePipeline<D>,
    predictor: VitalsPredictor<R>,
}

impl<D: FaceDetector, R: Regressor> VitalsPipeline<D, R> {
    pub fn new(config: &PipelineConfig, detector: D, regressor: R) -> Self {
        info!(
            "Vitals pipeline ready: profile={:?}, band={:.2}-{:.2} Hz",
            config.tracker.profile, config.bandpass.low_cutoff_hz, config.bandpass.high_cutoff_hz
        );
        Self {
            features: FeaturePipeline::new(config, detector),
            predictor: VitalsPredictor::new(regressor),
        }
    }

    /// Measure vital signs from a complete clip
    pub fn measure<S: FrameSource>(&mut self, source: S) -> Result<Measurement, PipelineError> {
        let extracted = self.features.extract(source)?;
        let vitals = self.predictor.predict(&extracted.features)?;
        info!(
            "Measured SBP={} DBP={} HR={} (ratio {:.3}, {} samples)",
            vitals.systolic_bp,
            vitals.diastolic_bp,
            vitals.heart_rate,
            extracted.diagnostics.detection_ratio,
            extracted.diagnostics.sample_count
        );
        Ok(Measurement {
            vitals,
            diagnostics: extracted.diagnostics,
        })
    }

    /// Measure vital signs from a video file
    #[cfg(feature = "opencv")]
    pub fn measure_file<P: AsRef<std::path::Path>>(&mut self, path: P) -> Result<Measurement, PipelineError> {
        let source = frame_source::OpencvVideoSource::open(path)
            .map_err(|e| PipelineError::UnreadableInput(e.to_string()))?;
        self.measure(source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use face_roi::{CascadeParams, DetectError, FaceBox};
    use frame_source::{FrameSourceError, MemoryFrameSource, VideoFrame};
    use inference_engine::InferenceError;
    use std::collections::HashSet;
    use std::f64::consts::PI;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    /// Returns one fixed face except on the listed frame numbers
    struct PatternDetector {
        face: FaceBox,
        missing: HashSet<u64>,
    }

    impl PatternDetector {
        fn new(missing: impl IntoIterator<Item = u64>) -> Self {
            Self {
                face: FaceBox::new(40, 40, 80, 80),
                missing: missing.into_iter().collect(),
            }
        }
    }

    impl FaceDetector for PatternDetector {
        fn detect(&mut self, frame: &VideoFrame, _params: &CascadeParams) -> Result<Vec<FaceBox>, DetectError> {
            if self.missing.contains(&frame.sequence) {
                Ok(vec![])
            } else {
                Ok(vec![self.face])
            }
        }
    }

    struct FailingDetector;

    impl FaceDetector for FailingDetector {
        fn detect(&mut self, _frame: &VideoFrame, _params: &CascadeParams) -> Result<Vec<FaceBox>, DetectError> {
            Err(DetectError::Detection("backend crashed".into()))
        }
    }

    struct StubRegressor([f64; 3]);

    impl Regressor for StubRegressor {
        fn predict(&self, _features: &FeatureVector) -> Result<[f64; 3], InferenceError> {
            Ok(self.0)
        }
    }

    /// Frame source that records when it is dropped
    struct TrackedSource {
        inner: MemoryFrameSource,
        dropped: Arc<AtomicBool>,
    }

    impl FrameSource for TrackedSource {
        fn declared_fps(&self) -> f64 {
            self.inner.declared_fps()
        }

        fn next_frame(&mut self) -> Result<Option<VideoFrame>, FrameSourceError> {
            self.inner.next_frame()
        }
    }

    impl Drop for TrackedSource {
        fn drop(&mut self) {
            self.dropped.store(true, Ordering::SeqCst);
        }
    }

    /// Green level 100 + 5 sin(2 pi 1.2 t) over the whole frame
    fn pulse_clip(frames: usize, fps: f64) -> MemoryFrameSource {
        let render_fps = if fps > 0.0 { fps } else { 30.0 };
        MemoryFrameSource::from_fn(frames, fps, |i| {
            let t = i as f64 / render_fps;
            let green = (100.0 + 5.0 * (2.0 * PI * 1.2 * t).sin()).round() as u8;
            VideoFrame::filled(160, 160, [60, green, 60], i as u64)
        })
    }

    fn pipeline<D: FaceDetector>(detector: D) -> VitalsPipeline<D, StubRegressor> {
        VitalsPipeline::new(
            &PipelineConfig::default(),
            detector,
            StubRegressor([121.6, 79.5, 72.2]),
        )
    }

    #[test]
    fn test_accepted_clip() {
        // Every 15th frame has no face: 140 of 150 detected
        let missing = (0..150u64).filter(|i| i % 15 == 0);
        let mut pipeline = pipeline(PatternDetector::new(missing));

        let measurement = pipeline.measure(pulse_clip(150, 30.0)).unwrap();

        assert_eq!(
            measurement.vitals,
            VitalsResult {
                systolic_bp: 122,
                diastolic_bp: 80,
                heart_rate: 72
            }
        );
        let diagnostics = measurement.diagnostics;
        assert_eq!(diagnostics.sample_count, 150);
        assert!((diagnostics.detection_ratio - 140.0 / 150.0).abs() < 1e-12);
        assert_eq!(diagnostics.frame_rate, 30.0);
        assert!(diagnostics.dominant_frequency_hz.is_some());
    }

    #[test]
    fn test_accepted_clip_features() {
        let missing = (0..150u64).filter(|i| i % 15 == 0);
        let mut features = FeaturePipeline::new(&PipelineConfig::default(), PatternDetector::new(missing));

        let extracted = features.extract(pulse_clip(150, 30.0)).unwrap();
        let v = extracted.features;

        assert!(v.peak_to_peak() > 0.0);
        assert_eq!(v.peak_to_peak(), v.max() - v.min());
        // The band excludes DC, so the 100-level baseline is removed
        assert!(v.mean().abs() < 20.0);
        assert!(v.as_slice().iter().all(|x| x.is_finite()));
    }

    #[test]
    fn test_clean_pulse_dominant_frequency() {
        let mut pipeline = pipeline(PatternDetector::new([]));
        let measurement = pipeline.measure(pulse_clip(300, 30.0)).unwrap();

        let dominant = measurement.diagnostics.dominant_frequency_hz.unwrap();
        assert!((dominant - 1.2).abs() < 0.15);
        assert_eq!(measurement.diagnostics.detection_ratio, 1.0);
    }

    #[test]
    fn test_low_detection_ratio_rejected() {
        let missing = (0..40u64).filter(|i| i % 2 == 1);
        let mut pipeline = pipeline(PatternDetector::new(missing));

        let err = pipeline.measure(pulse_clip(40, 30.0)).unwrap_err();
        assert_eq!(err.rejection(), Some(RejectionReason::InsufficientDetectionConsistency));
        assert_eq!(err.reason_code(), Some("insufficient-detection-consistency"));
    }

    #[test]
    fn test_short_clip_rejected() {
        let mut pipeline = pipeline(PatternDetector::new([]));
        let err = pipeline.measure(pulse_clip(15, 30.0)).unwrap_err();
        assert_eq!(err.reason_code(), Some("insufficient-signal-length"));
    }

    #[test]
    fn test_gate_minimum_also_governs_filter() {
        let mut config = PipelineConfig::default();
        config.gate.min_samples = 15;
        let mut pipeline = VitalsPipeline::new(&config, PatternDetector::new([]), StubRegressor([1.0, 1.0, 1.0]));

        let measurement = pipeline.measure(pulse_clip(16, 30.0)).unwrap();
        assert_eq!(measurement.diagnostics.sample_count, 16);

        let err = pipeline.measure(pulse_clip(14, 30.0)).unwrap_err();
        assert_eq!(err.rejection(), Some(RejectionReason::InsufficientSignalLength));
    }

    #[test]
    fn test_low_frame_rate_rejected() {
        let mut pipeline = pipeline(PatternDetector::new([]));
        let err = pipeline.measure(pulse_clip(60, 5.0)).unwrap_err();
        assert_eq!(err.rejection(), Some(RejectionReason::SamplingRateTooLow));
    }

    #[test]
    fn test_empty_clip_is_length_rejection() {
        let mut pipeline = pipeline(PatternDetector::new([]));
        let err = pipeline.measure(MemoryFrameSource::new(vec![], 30.0)).unwrap_err();
        assert_eq!(err.rejection(), Some(RejectionReason::InsufficientSignalLength));
    }

    #[test]
    fn test_unreported_frame_rate_uses_default() {
        let mut pipeline = pipeline(PatternDetector::new([]));
        let measurement = pipeline.measure(pulse_clip(90, 0.0)).unwrap();
        assert_eq!(measurement.diagnostics.frame_rate, 30.0);
    }

    #[test]
    fn test_frame_rate_override() {
        let mut config = PipelineConfig::default();
        config.source.fps_override = Some(6.0);
        let mut pipeline = VitalsPipeline::new(&config, PatternDetector::new([]), StubRegressor([1.0, 1.0, 1.0]));

        let err = pipeline.measure(pulse_clip(90, 30.0)).unwrap_err();
        assert_eq!(err.rejection(), Some(RejectionReason::SamplingRateTooLow));
    }

    #[test]
    fn test_source_released_on_success_and_rejection() {
        let mut pipeline = pipeline(PatternDetector::new([]));

        for frames in [150, 10] {
            let dropped = Arc::new(AtomicBool::new(false));
            let source = TrackedSource {
                inner: pulse_clip(frames, 30.0),
                dropped: dropped.clone(),
            };
            let _ = pipeline.measure(source);
            assert!(dropped.load(Ordering::SeqCst));
        }
    }

    #[test]
    fn test_corrupt_frame_is_unreadable_input() {
        let mut pipeline = pipeline(PatternDetector::new([]));
        let dropped = Arc::new(AtomicBool::new(false));
        let source = TrackedSource {
            inner: pulse_clip(50, 30.0).corrupt_at(20),
            dropped: dropped.clone(),
        };

        let err = pipeline.measure(source).unwrap_err();
        assert!(matches!(err, PipelineError::UnreadableInput(_)));
        assert!(dropped.load(Ordering::SeqCst));
    }

    #[test]
    fn test_detector_failure_propagates() {
        let mut pipeline = pipeline(FailingDetector);
        let err = pipeline.measure(pulse_clip(30, 30.0)).unwrap_err();
        assert!(matches!(err, PipelineError::Detection(_)));
    }

    #[test]
    fn test_non_finite_model_output_is_an_error() {
        let mut pipeline = VitalsPipeline::new(
            &PipelineConfig::default(),
            PatternDetector::new([]),
            StubRegressor([f64::NAN, 80.0, 70.0]),
        );
        let err = pipeline.measure(pulse_clip(60, 30.0)).unwrap_err();
        assert!(matches!(err, PipelineError::Inference(_)));
    }

    #[test]
    fn test_measurement_serializes() {
        let mut pipeline = pipeline(PatternDetector::new([]));
        let measurement = pipeline.measure(pulse_clip(60, 30.0)).unwrap();
        let json = serde_json::to_value(measurement).unwrap();
        assert_eq!(json["vitals"]["systolic_bp"], 122);
        assert_eq!(json["diagnostics"]["sample_count"], 60);
    }
}
