//! Face detection backends

use frame_source::VideoFrame;

use crate::config::CascadeParams;
use crate::region::FaceBox;
use crate::DetectError;

/// Frontal face detector.
///
/// Detection is a pure function of the frame and parameters; no state is
/// carried from one frame to the next.
pub trait FaceDetector {
    /// Detect face candidates in `frame`
    fn detect(&mut self, frame: &VideoFrame, params: &CascadeParams) -> Result<Vec<FaceBox>, DetectError>;
}

impl<D: FaceDetector + ?Sized> FaceDetector for Box<D> {
    fn detect(&mut self, frame: &VideoFrame, params: &CascadeParams) -> Result<Vec<FaceBox>, DetectError> {
        (**self).detect(frame, params)
    }
}

impl<D: FaceDetector + ?Sized> FaceDetector for &mut D {
    fn detect(&mut self, frame: &VideoFrame, params: &CascadeParams) -> Result<Vec<FaceBox>, DetectError> {
        (**self).detect(frame, params)
    }
}

#[cfg(feature = "opencv")]
pub use cascade::{CascadeFaceDetector, FRONTAL_FACE_CASCADE};

#[cfg(feature = "opencv")]
mod cascade {
    use std::path::Path;

    use frame_source::VideoFrame;
    use opencv::{
        core::{Mat, Rect, Scalar, Size, Vector, CV_8UC1},
        objdetect::CascadeClassifier,
        prelude::*,
    };
    use tracing::{error, info};

    use super::FaceDetector;
    use crate::config::CascadeParams;
    use crate::region::FaceBox;
    use crate::DetectError;

    /// File name of the stock frontal face cascade
    pub const FRONTAL_FACE_CASCADE: &str = "haarcascade_frontalface_default.xml";

    /// Haar cascade face detector
    pub struct CascadeFaceDetector {
        classifier: CascadeClassifier,
    }

    impl CascadeFaceDetector {
        /// Load a cascade definition from disk
        pub fn load(path: impl AsRef<Path>) -> Result<Self, DetectError> {
            let path = path.as_ref();
            let path_str = path
                .to_str()
                .ok_or_else(|| DetectError::ModelLoad(format!("non UTF-8 path: {}", path.display())))?;

            info!("Loading face cascade from {}", path_str);
            let classifier = CascadeClassifier::new(path_str).map_err(|e| {
                error!("Failed to load face cascade: {}", e);
                DetectError::ModelLoad(e.to_string())
            })?;

            let empty = classifier
                .empty()
                .map_err(|e| DetectError::ModelLoad(e.to_string()))?;
            if empty {
                return Err(DetectError::ModelLoad(format!("{} contains no cascade", path_str)));
            }

            Ok(Self { classifier })
        }

        fn gray_mat(frame: &VideoFrame) -> Result<Mat, DetectError> {
            let gray = frame.to_grayscale();
            let mut mat = Mat::new_rows_cols_with_default(
                frame.height as i32,
                frame.width as i32,
                CV_8UC1,
                Scalar::all(0.0),
            )
            .map_err(|e| DetectError::Detection(e.to_string()))?;

            mat.data_bytes_mut()
                .map_err(|e| DetectError::Detection(e.to_string()))?
                .copy_from_slice(&gray);
            Ok(mat)
        }
    }

    impl FaceDetector for CascadeFaceDetector {
        fn detect(&mut self, frame: &VideoFrame, params: &CascadeParams) -> Result<Vec<FaceBox>, DetectError> {
            let gray = Self::gray_mat(frame)?;
            let min_size = params
                .min_size
                .map(|(w, h)| Size::new(w, h))
                .unwrap_or_default();

            let mut rects = Vector::<Rect>::new();
            self.classifier
                .detect_multi_scale(
                    &gray,
                    &mut rects,
                    params.scale_factor,
                    params.min_neighbors,
                    0,
                    min_size,
                    Size::default(),
                )
                .map_err(|e| DetectError::Detection(e.to_string()))?;

            Ok(rects
                .iter()
                .map(|r| FaceBox::new(r.x, r.y, r.width, r.height))
                .collect())
        }
    }
}
