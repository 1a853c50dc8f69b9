//! Driver Monitoring System (DMS)
//!
//! Webcam drowsiness detection:
//! - Face and eye region detection (pluggable detectors)
//! - Eye openness scoring
//! - Consecutive closed-frame tracking and alerting
//! - Frame overlay annotations

pub mod analysis;
pub mod config;
pub mod detector;
pub mod font;
pub mod openness;
pub mod overlay;
pub mod state;

pub use analysis::{Annotation, EyeObservation, Evaluation, FaceObservation, OverlayLine, Region};
pub use config::{DetectorConfig, DmsConfig, EYE_AR_CONSEC_FRAMES, EYE_AR_THRESH};
pub use detector::{Detection, OnnxRegionDetector, RegionDetector};
pub use openness::openness_score;
pub use state::DrowsinessTracker;

use frame_codec::Frame;
use image::GrayImage;
use thiserror::Error;
use tracing::debug;

/// DMS error types
#[derive(Error, Debug)]
pub enum DmsError {
    #[error("Model loading failed: {0}")]
    ModelLoad(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Image processing failed: {0}")]
    ImageProcessing(String),
}

/// Drowsiness monitoring module: detectors plus thresholds.
///
/// Holds no per-session state; pair it with a [`DrowsinessTracker`].
pub struct DmsModule {
    config: DmsConfig,
    face_detector: Box<dyn RegionDetector>,
    eye_detector: Box<dyn RegionDetector>,
}

impl DmsModule {
    /// Create a DMS module, loading both ONNX detectors
    pub fn new(config: DmsConfig) -> Result<Self, DmsError> {
        config.validate()?;
        let face_detector = OnnxRegionDetector::load("face", &config.face)?;
        let eye_detector = OnnxRegionDetector::load("eye", &config.eye)?;
        Ok(Self::with_detectors(
            config,
            Box::new(face_detector),
            Box::new(eye_detector),
        ))
    }

    /// Create a DMS module around already-constructed detectors
    pub fn with_detectors(
        config: DmsConfig,
        face_detector: Box<dyn RegionDetector>,
        eye_detector: Box<dyn RegionDetector>,
    ) -> Self {
        Self {
            config,
            face_detector,
            eye_detector,
        }
    }

    pub fn config(&self) -> &DmsConfig {
        &self.config
    }

    /// Detect faces and eyes in a frame and score every eye.
    ///
    /// Detection runs on the histogram-equalized grayscale frame; eyes are
    /// searched inside each face crop and reported relative to it.
    pub fn observe(&self, frame: &Frame) -> Result<Vec<FaceObservation>, DmsError> {
        let gray = imageproc::contrast::equalize_histogram(&frame.to_grayscale());
        let (width, height) = gray.dimensions();

        let faces = self.face_detector.detect(&gray)?;
        let mut observations = Vec::with_capacity(faces.len());

        for face in faces {
            let Some(face_region) = face.region.clamp_to(width, height) else {
                continue;
            };
            let face_gray = crop(&gray, &face_region);

            let eyes = self
                .eye_detector
                .detect(&face_gray)?
                .into_iter()
                .filter_map(|eye| eye.region.clamp_to(face_region.width, face_region.height))
                .map(|eye_region| EyeObservation {
                    region: eye_region,
                    openness: openness_score(&crop(&face_gray, &eye_region)),
                })
                .collect::<Vec<_>>();

            debug!(
                "Face at ({}, {}) {}x{}: {} eyes",
                face_region.x,
                face_region.y,
                face_region.width,
                face_region.height,
                eyes.len()
            );
            observations.push(FaceObservation {
                region: face_region,
                eyes,
            });
        }

        Ok(observations)
    }

    /// Observe a frame and fold the result into `tracker`
    pub fn analyze(
        &self,
        frame: &Frame,
        tracker: &mut DrowsinessTracker,
    ) -> Result<Evaluation, DmsError> {
        let faces = self.observe(frame)?;
        Ok(tracker.evaluate(&faces, self.config.consec_frames, self.config.ear_threshold))
    }
}

fn crop(image: &GrayImage, region: &Region) -> GrayImage {
    image::imageops::crop_imm(image, region.x, region.y, region.width, region.height).to_image()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    /// Returns the same regions for every image
    struct FixedDetector(Vec<Region>);

    impl RegionDetector for FixedDetector {
        fn detect(&self, _image: &GrayImage) -> Result<Vec<Detection>, DmsError> {
            Ok(self.0.iter().map(|r| Detection::new(*r, 0.9)).collect())
        }
    }

    struct FailingDetector;

    impl RegionDetector for FailingDetector {
        fn detect(&self, _image: &GrayImage) -> Result<Vec<Detection>, DmsError> {
            Err(DmsError::Inference("boom".to_string()))
        }
    }

    fn module(faces: Vec<Region>, eyes: Vec<Region>) -> DmsModule {
        DmsModule::with_detectors(
            DmsConfig::default(),
            Box::new(FixedDetector(faces)),
            Box::new(FixedDetector(eyes)),
        )
    }

    fn frame() -> Frame {
        Frame::new(RgbImage::from_pixel(200, 150, Rgb([128, 128, 128])))
    }

    #[test]
    fn test_observe_scores_eyes_relative_to_face() {
        let module = module(
            vec![Region::new(50, 20, 100, 100)],
            vec![Region::new(10, 10, 20, 10), Region::new(60, 10, 20, 10)],
        );
        let faces = module.observe(&frame()).unwrap();
        assert_eq!(faces.len(), 1);
        assert_eq!(faces[0].eyes.len(), 2);
        assert_eq!(faces[0].eyes[0].region, Region::new(10, 10, 20, 10));
        // A 2:1 wide box can never score above 0.5
        assert!(faces[0].eyes[0].openness <= 0.5 + 1e-6);
        assert!(faces[0].eyes[0].openness >= 0.35 - 1e-6);
    }

    #[test]
    fn test_observe_clamps_regions() {
        let module = module(
            vec![Region::new(150, 100, 100, 100), Region::new(300, 300, 10, 10)],
            vec![Region::new(40, 40, 30, 30)],
        );
        let faces = module.observe(&frame()).unwrap();
        assert_eq!(faces.len(), 1);
        assert_eq!(faces[0].region, Region::new(150, 100, 50, 50));
        assert_eq!(faces[0].eyes[0].region, Region::new(40, 40, 10, 10));
    }

    #[test]
    fn test_analyze_counts_missing_eyes() {
        let module = module(vec![Region::new(50, 20, 100, 100)], vec![]);
        let mut tracker = DrowsinessTracker::new();
        for _ in 0..EYE_AR_CONSEC_FRAMES {
            module.analyze(&frame(), &mut tracker).unwrap();
        }
        assert!(tracker.is_drowsy());
        assert_eq!(tracker.counter(), EYE_AR_CONSEC_FRAMES);
    }

    #[test]
    fn test_detector_errors_leave_tracker_untouched() {
        let module = DmsModule::with_detectors(
            DmsConfig::default(),
            Box::new(FailingDetector),
            Box::new(FixedDetector(vec![])),
        );
        let mut tracker = DrowsinessTracker::new();
        assert!(module.analyze(&frame(), &mut tracker).is_err());
        assert_eq!(tracker.counter(), 0);
    }

    #[test]
    fn test_new_requires_model_paths() {
        assert!(matches!(
            DmsModule::new(DmsConfig::default()),
            Err(DmsError::ModelLoad(_))
        ));
    }
}
