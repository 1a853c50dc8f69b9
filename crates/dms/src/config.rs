//! DMS configuration

use serde::{Deserialize, Deserializer, Serialize};

use crate::DmsError;

/// Default openness cutoff below which an eye counts as closed
pub const EYE_AR_THRESH: f32 = 0.3;

/// Default number of consecutive closed/absent evaluations before alerting
pub const EYE_AR_CONSEC_FRAMES: u32 = 15;

/// DMS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DmsConfig {
    /// Openness score below which an eye is classified closed
    pub ear_threshold: f32,

    /// Consecutive closed/absent evaluations required to raise the alert
    pub consec_frames: u32,

    /// Face detector settings
    #[serde(deserialize_with = "face_detector")]
    pub face: DetectorConfig,

    /// Eye detector settings (runs on each face sub-image)
    #[serde(deserialize_with = "eye_detector")]
    pub eye: DetectorConfig,
}

impl Default for DmsConfig {
    fn default() -> Self {
        Self {
            ear_threshold: EYE_AR_THRESH,
            consec_frames: EYE_AR_CONSEC_FRAMES,
            face: DetectorConfig::face(),
            eye: DetectorConfig::eye(),
        }
    }
}

impl DmsConfig {
    /// Check threshold ranges
    pub fn validate(&self) -> Result<(), DmsError> {
        if self.consec_frames == 0 {
            return Err(DmsError::Config(
                "consec_frames must be at least 1".to_string(),
            ));
        }
        if !(self.ear_threshold > 0.0 && self.ear_threshold < 1.0) {
            return Err(DmsError::Config(format!(
                "ear_threshold must be in (0, 1), got {}",
                self.ear_threshold
            )));
        }
        self.face.validate("face")?;
        self.eye.validate("eye")
    }
}

/// Settings for one ONNX region detector
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectorConfig {
    /// Path to the ONNX model
    pub model_path: Option<String>,

    /// Model input width (pixels)
    pub input_width: usize,

    /// Model input height (pixels)
    pub input_height: usize,

    /// Minimum class score for a candidate box
    pub score_threshold: f32,

    /// IoU above which overlapping boxes are suppressed
    pub iou_threshold: f32,

    /// Smallest accepted region side (pixels, in source image space)
    pub min_size: u32,
}

impl DetectorConfig {
    /// Face detector defaults (UltraFace RFB-320 input, 30 px minimum face)
    pub fn face() -> Self {
        Self {
            model_path: None,
            input_width: 320,
            input_height: 240,
            score_threshold: 0.7,
            iou_threshold: 0.3,
            min_size: 30,
        }
    }

    /// Eye detector defaults (20 px minimum eye)
    pub fn eye() -> Self {
        Self {
            model_path: None,
            input_width: 128,
            input_height: 96,
            score_threshold: 0.5,
            iou_threshold: 0.3,
            min_size: 20,
        }
    }

    fn validate(&self, name: &str) -> Result<(), DmsError> {
        if self.input_width == 0 || self.input_height == 0 {
            return Err(DmsError::Config(format!(
                "{} detector input size must be non-zero",
                name
            )));
        }
        if !(0.0..=1.0).contains(&self.score_threshold) || !(0.0..=1.0).contains(&self.iou_threshold) {
            return Err(DmsError::Config(format!(
                "{} detector thresholds must be in [0, 1]",
                name
            )));
        }
        Ok(())
    }
}

/// Partially specified detector section, merged over role defaults
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DetectorOverrides {
    model_path: Option<String>,
    input_width: Option<usize>,
    input_height: Option<usize>,
    score_threshold: Option<f32>,
    iou_threshold: Option<f32>,
    min_size: Option<u32>,
}

impl DetectorOverrides {
    fn apply(self, base: DetectorConfig) -> DetectorConfig {
        DetectorConfig {
            model_path: self.model_path.or(base.model_path),
            input_width: self.input_width.unwrap_or(base.input_width),
            input_height: self.input_height.unwrap_or(base.input_height),
            score_threshold: self.score_threshold.unwrap_or(base.score_threshold),
            iou_threshold: self.iou_threshold.unwrap_or(base.iou_threshold),
            min_size: self.min_size.unwrap_or(base.min_size),
        }
    }
}

fn face_detector<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DetectorConfig, D::Error> {
    Ok(DetectorOverrides::deserialize(deserializer)?.apply(DetectorConfig::face()))
}

fn eye_detector<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DetectorConfig, D::Error> {
    Ok(DetectorOverrides::deserialize(deserializer)?.apply(DetectorConfig::eye()))
}
