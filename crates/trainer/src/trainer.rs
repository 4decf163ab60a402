//! Training procedure

use std::fmt;
use std::path::Path;

use face_roi::FaceDetector;
use feature_engine::{FeatureVector, FEATURE_DIMENSION};
use frame_source::{FrameSource, FrameSourceError};
use inference_engine::{VitalsModel, TARGET_DIMENSION};
use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use vitals_pipeline::{FeaturePipeline, PipelineError, RejectionReason};

use crate::config::TrainingConfig;
use crate::manifest::{load_manifest, LabelRecord};
use crate::metrics::{mean_absolute_error, TargetErrors};
use crate::split::train_test_split;
use crate::TrainingError;

/// Opens the video behind a manifest entry
pub trait VideoOpener {
    type Source: FrameSource;

    fn open(&mut self, path: &Path) -> Result<Self::Source, FrameSourceError>;
}

/// Video files decoded with OpenCV
#[cfg(feature = "opencv")]
#[derive(Debug, Clone, Copy, Default)]
pub struct OpencvOpener;

#[cfg(feature = "opencv")]
impl VideoOpener for OpencvOpener {
    type Source = frame_source::OpencvVideoSource;

    fn open(&mut self, path: &Path) -> Result<Self::Source, FrameSourceError> {
        frame_source::OpencvVideoSource::open(path)
    }
}

/// Why an entry was left out of the training matrix
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "kebab-case")]
pub enum SkipReason {
    MissingVideo,
    Unreadable(String),
    Rejected(RejectionReason),
    Failed(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingVideo => f.write_str("video file not found"),
            Self::Unreadable(e) => write!(f, "unreadable video: {}", e),
            Self::Rejected(reason) => write!(f, "rejected: {}", reason),
            Self::Failed(e) => write!(f, "processing failed: {}", e),
        }
    }
}

impl From<PipelineError> for SkipReason {
    fn from(error: PipelineError) -> Self {
        match error {
            PipelineError::Rejected(reason) => Self::Rejected(reason),
            PipelineError::UnreadableInput(e) => Self::Unreadable(e),
            other => Self::Failed(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedEntry {
    pub filename: String,
    pub reason: SkipReason,
}

/// Outcome of a training run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    /// Entries that produced a training row
    pub processed: usize,
    pub skipped: Vec<SkippedEntry>,
    pub train_rows: usize,
    pub test_rows: usize,
    /// Held-out error, absent when nothing was held out
    pub mae: Option<TargetErrors>,
}

/// Collected (features, labels) rows
#[derive(Debug, Clone, Default)]
pub struct TrainingSet {
    pub features: Vec<FeatureVector>,
    pub targets: Vec<[f64; TARGET_DIMENSION]>,
    pub skipped: Vec<SkippedEntry>,
}

impl TrainingSet {
    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    fn matrices(&self) -> (Array2<f64>, Array2<f64>) {
        let n = self.len();
        let x = Array2::from_shape_fn((n, FEATURE_DIMENSION), |(i, j)| self.features[i].values[j]);
        let y = Array2::from_shape_fn((n, TARGET_DIMENSION), |(i, j)| self.targets[i][j]);
        (x, y)
    }
}

/// Runs labeled videos through feature extraction and fits the model
pub struct Trainer<D, O> {
    config: TrainingConfig,
    features: FeaturePipeline<D>,
    opener: O,
}

impl<D: FaceDetector, O: VideoOpener> Trainer<D, O> {
    pub fn new(config: TrainingConfig, detector: D, opener: O) -> Self {
        let features = FeaturePipeline::new(&config.pipeline, detector);
        Self {
            config,
            features,
            opener,
        }
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Extract a training row per entry, skipping entries that fail
    pub fn collect(&mut self, records: &[LabelRecord]) -> TrainingSet {
        let mut set = TrainingSet::default();

        for record in records {
            let path = record.video_path(&self.config.video_dir, &self.config.video_extension);

            let outcome = if path.is_file() {
                self.opener
                    .open(&path)
                    .map_err(|e| SkipReason::Unreadable(e.to_string()))
                    .and_then(|source| self.features.extract(source).map_err(SkipReason::from))
            } else {
                Err(SkipReason::MissingVideo)
            };

            match outcome {
                Ok(extracted) => {
                    set.features.push(extracted.features);
                    set.targets.push(record.targets());
                }
                Err(reason) => {
                    warn!("Skipping {} ({}): {}", record.filename, path.display(), reason);
                    set.skipped.push(SkippedEntry {
                        filename: record.filename.clone(),
                        reason,
                    });
                }
            }
        }

        info!(
            "Collected {} training rows, skipped {} of {} entries",
            set.len(),
            set.skipped.len(),
            records.len()
        );
        set
    }

    /// Fit on the training partition and score the held-out partition
    pub fn fit(&self, set: TrainingSet) -> Result<(VitalsModel, TrainingReport), TrainingError> {
        if set.is_empty() {
            return Err(TrainingError::NoValidSamples {
                skipped: set.skipped.len(),
            });
        }

        let (x, y) = set.matrices();
        let split = train_test_split(set.len(), self.config.test_fraction, self.config.split_seed);

        let x_train = x.select(Axis(0), &split.train);
        let y_train = y.select(Axis(0), &split.train);
        let model = VitalsModel::fit(x_train.view(), y_train.view(), &self.config.forest)?;

        let mae = if split.test.is_empty() {
            info!("Fewer than two samples, held-out evaluation skipped");
            None
        } else {
            let x_test = x.select(Axis(0), &split.test);
            let y_test = y.select(Axis(0), &split.test);
            let predicted = model.forest().predict_batch(x_test.view())?;
            mean_absolute_error(predicted.view(), y_test.view())
        };

        if let Some(errors) = &mae {
            info!("Held-out MAE systolic: {:.2} mmHg", errors.systolic);
            info!("Held-out MAE diastolic: {:.2} mmHg", errors.diastolic);
            info!("Held-out MAE heart rate: {:.2} bpm", errors.heart_rate);
        }

        let report = TrainingReport {
            processed: set.len(),
            skipped: set.skipped,
            train_rows: split.train.len(),
            test_rows: split.test.len(),
            mae,
        };
        Ok((model, report))
    }

    /// Full procedure: manifest, extraction, fit, evaluation, artifact
    pub fn run(&mut self) -> Result<TrainingReport, TrainingError> {
        let records = load_manifest(&self.config.manifest_path)?;
        let set = self.collect(&records);
        let (model, report) = self.fit(set)?;
        model.save(&self.config.model_path)?;
        info!("Model written to {}", self.config.model_path.display());
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use face_roi::{CascadeParams, DetectError, FaceBox};
    use frame_source::{MemoryFrameSource, VideoFrame};
    use inference_engine::Regressor;
    use std::f64::consts::PI;
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tracing::{Event, Level, Subscriber};
    use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

    struct AlwaysFace;

    /// Loses the face in the first three frames of every ten
    struct FlickeringFace;

    impl FaceDetector for FlickeringFace {
        fn detect(&mut self, frame: &VideoFrame, _params: &CascadeParams) -> Result<Vec<FaceBox>, DetectError> {
            if frame.sequence % 10 < 3 {
                Ok(vec![])
            } else {
                Ok(vec![FaceBox::new(60, 40, 120, 120)])
            }
        }
    }

    /// Counts WARN events emitted by this crate
    #[derive(Clone, Default)]
    struct WarnCounter(Arc<AtomicUsize>);

    impl WarnCounter {
        fn count(&self) -> usize {
            self.0.load(Ordering::SeqCst)
        }
    }

    impl<S: Subscriber> Layer<S> for WarnCounter {
        fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
            let metadata = event.metadata();
            if *metadata.level() == Level::WARN && metadata.target().starts_with("trainer") {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    impl FaceDetector for AlwaysFace {
        fn detect(&mut self, _frame: &VideoFrame, _params: &CascadeParams) -> Result<Vec<FaceBox>, DetectError> {
            Ok(vec![FaceBox::new(60, 40, 120, 120)])
        }
    }

    /// Synthesizes a pulse clip whose amplitude and length come from the file contents
    struct SyntheticOpener;

    impl VideoOpener for SyntheticOpener {
        type Source = MemoryFrameSource;

        fn open(&mut self, path: &Path) -> Result<MemoryFrameSource, FrameSourceError> {
            let spec = fs::read_to_string(path).map_err(|e| FrameSourceError::Open(e.to_string()))?;
            let mut parts = spec.split_whitespace();
            let amplitude: f64 = parts.next().and_then(|s| s.parse().ok()).unwrap_or(5.0);
            let frames: usize = parts.next().and_then(|s| s.parse().ok()).unwrap_or(150);

            Ok(MemoryFrameSource::from_fn(frames, 30.0, |i| {
                let t = i as f64 / 30.0;
                let green = (100.0 + amplitude * (2.0 * PI * 1.2 * t).sin()).round() as u8;
                VideoFrame::filled(160, 120, [70, green, 70], i as u64)
            }))
        }
    }

    fn write_dataset(dir: &Path, entries: usize, missing: &[usize]) -> TrainingConfig {
        let videos = dir.join("videos");
        fs::create_dir_all(&videos).unwrap();

        let mut manifest = String::from("filename,systolic_bp,diastolic_bp,heart_rate\n");
        for i in 0..entries {
            let name = format!("subject_{:02}", i);
            manifest.push_str(&format!("{},{},{},{}\n", name, 110 + i * 3, 70 + i, 60 + i * 2));
            if !missing.contains(&i) {
                fs::write(videos.join(format!("{}.mp4", name)), format!("{} 150", 2 + i)).unwrap();
            }
        }
        let manifest_path = dir.join("labels.csv");
        fs::write(&manifest_path, manifest).unwrap();

        TrainingConfig {
            manifest_path,
            video_dir: videos,
            model_path: dir.join("trained_model").join("vital_signs_model.bin"),
            forest: inference_engine::ForestConfig {
                n_trees: 20,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_missing_videos_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_dataset(dir.path(), 10, &[3, 7]);
        let model_path = config.model_path.clone();

        let warnings = WarnCounter::default();
        let subscriber = tracing_subscriber::registry().with(warnings.clone());
        let report = tracing::subscriber::with_default(subscriber, || {
            Trainer::new(config, AlwaysFace, SyntheticOpener).run()
        })
        .unwrap();

        assert_eq!(warnings.count(), 2);
        assert_eq!(report.processed, 8);
        assert_eq!(report.skipped.len(), 2);
        assert!(report.skipped.iter().all(|s| s.reason == SkipReason::MissingVideo));
        assert_eq!(report.skipped[0].filename, "subject_03");
        assert_eq!(report.train_rows + report.test_rows, 8);
        assert_eq!(report.test_rows, 2);

        let errors = report.mae.unwrap();
        assert!(errors.systolic.is_finite() && errors.diastolic.is_finite() && errors.heart_rate.is_finite());

        let model = VitalsModel::load(&model_path).unwrap();
        let prediction = model.predict(&FeatureVector::new([0.0, 2.0, -4.0, 4.0, 8.0])).unwrap();
        assert!(prediction[0] >= 110.0 && prediction[0] <= 137.0);
    }

    #[test]
    fn test_rejected_clip_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_dataset(dir.path(), 4, &[]);
        fs::write(config.video_dir.join("subject_01.mp4"), "5 12").unwrap();

        let mut trainer = Trainer::new(config, AlwaysFace, SyntheticOpener);
        let records = load_manifest(&trainer.config().manifest_path.clone()).unwrap();
        let set = trainer.collect(&records);

        assert_eq!(set.len(), 3);
        assert_eq!(
            set.skipped[0].reason,
            SkipReason::Rejected(RejectionReason::InsufficientSignalLength)
        );
    }

    #[test]
    fn test_partial_face_loss_still_trains() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_dataset(dir.path(), 1, &[]);
        let mut pipeline = config.pipeline.clone();

        let mut trainer = Trainer::new(config, FlickeringFace, SyntheticOpener);
        let records = load_manifest(&trainer.config().manifest_path.clone()).unwrap();
        let set = trainer.collect(&records);
        assert_eq!(set.len(), 1);
        assert!(set.skipped.is_empty());

        // The same clip fails the measurement-time gate
        pipeline.gate.min_detection_ratio = 0.8;
        let video = records[0].video_path(&trainer.config().video_dir, "mp4");
        let err = FeaturePipeline::new(&pipeline, FlickeringFace)
            .extract(SyntheticOpener.open(&video).unwrap())
            .unwrap_err();
        assert_eq!(err.rejection(), Some(RejectionReason::InsufficientDetectionConsistency));
    }

    #[test]
    fn test_no_valid_samples_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_dataset(dir.path(), 3, &[0, 1, 2]);
        let model_path = config.model_path.clone();

        let result = Trainer::new(config, AlwaysFace, SyntheticOpener).run();
        assert!(matches!(result, Err(TrainingError::NoValidSamples { skipped: 3 })));
        assert!(!model_path.exists());
    }

    #[test]
    fn test_single_sample_skips_evaluation() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_dataset(dir.path(), 2, &[1]);

        let report = Trainer::new(config, AlwaysFace, SyntheticOpener).run().unwrap();
        assert_eq!(report.processed, 1);
        assert_eq!(report.train_rows, 1);
        assert_eq!(report.test_rows, 0);
        assert!(report.mae.is_none());
    }

    #[test]
    fn test_report_serializes_skip_reasons() {
        let entry = SkippedEntry {
            filename: "subject_09".into(),
            reason: SkipReason::Rejected(RejectionReason::SamplingRateTooLow),
        };
        let json = serde_json::to_string(&entry).unwrap();
        assert_eq!(
            json,
            r#"{"filename":"subject_09","reason":{"kind":"rejected","detail":"sampling-rate-too-low"}}"#
        );
    }
}
