//! Face and eye region detection
//!
//! Detection is an injected capability: the pipeline only sees the
//! [`RegionDetector`] trait, so tests can feed synthetic regions while the
//! service loads ONNX models.

use image::imageops::FilterType;
use image::GrayImage;
use serde::{Deserialize, Serialize};
use tract_onnx::prelude::*;
use tracing::{debug, error, info};

use crate::analysis::Region;
use crate::config::DetectorConfig;
use crate::DmsError;

/// Detected region with detector metadata
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub region: Region,
    /// Detector confidence (0-1)
    pub confidence: f32,
}

impl Detection {
    pub fn new(region: Region, confidence: f32) -> Self {
        Self { region, confidence }
    }
}

/// Something that finds rectangular regions in a grayscale image
pub trait RegionDetector: Send + Sync {
    /// Detect regions; coordinates are relative to `image`
    fn detect(&self, image: &GrayImage) -> Result<Vec<Detection>, DmsError>;
}

type DetectorPlan = TypedRunnableModel<TypedModel>;

/// SSD-style ONNX detector (UltraFace output layout)
///
/// Expects two outputs: class scores `[1, N, 2]` (background, object) and
/// normalized corner boxes `[1, N, 4]`.
pub struct OnnxRegionDetector {
    name: String,
    config: DetectorConfig,
    plan: DetectorPlan,
}

impl OnnxRegionDetector {
    /// Load the model named by `config.model_path`
    pub fn load(name: &str, config: &DetectorConfig) -> Result<Self, DmsError> {
        let path = config.model_path.as_deref().ok_or_else(|| {
            DmsError::ModelLoad(format!("No {} model path configured", name))
        })?;

        info!("Loading {} detection model from {}", name, path);
        let shape = [1, 3, config.input_height, config.input_width];
        let plan = tract_onnx::onnx()
            .model_for_path(path)
            .and_then(|model| model.with_input_fact(0, f32::fact(shape).into()))
            .and_then(|model| model.into_optimized())
            .and_then(|model| model.into_runnable())
            .map_err(|e| {
                error!("Failed to load {} model: {}", name, e);
                DmsError::ModelLoad(format!("{}: {}", path, e))
            })?;

        Ok(Self {
            name: name.to_string(),
            config: config.clone(),
            plan,
        })
    }

    /// Grayscale image -> normalized 1x3xHxW tensor
    fn preprocess(&self, image: &GrayImage) -> Result<Tensor, DmsError> {
        let (w, h) = (self.config.input_width, self.config.input_height);
        let resized = image::imageops::resize(image, w as u32, h as u32, FilterType::Triangle);

        let plane: Vec<f32> = resized
            .as_raw()
            .iter()
            .map(|&p| (p as f32 - 127.0) / 128.0)
            .collect();
        let mut data = Vec::with_capacity(plane.len() * 3);
        for _ in 0..3 {
            data.extend_from_slice(&plane);
        }

        Tensor::from_shape(&[1, 3, h, w], &data)
            .map_err(|e| DmsError::ImageProcessing(e.to_string()))
    }
}

impl RegionDetector for OnnxRegionDetector {
    fn detect(&self, image: &GrayImage) -> Result<Vec<Detection>, DmsError> {
        let (img_w, img_h) = image.dimensions();
        if img_w == 0 || img_h == 0 {
            return Ok(Vec::new());
        }

        let input = self.preprocess(image)?;
        let outputs = self
            .plan
            .run(tvec!(input.into()))
            .map_err(|e| DmsError::Inference(format!("{}: {}", self.name, e)))?;
        if outputs.len() < 2 {
            return Err(DmsError::Inference(format!(
                "{}: expected scores and boxes outputs, got {}",
                self.name,
                outputs.len()
            )));
        }

        let scores = outputs[0]
            .as_slice::<f32>()
            .map_err(|e| DmsError::Inference(e.to_string()))?;
        let boxes = outputs[1]
            .as_slice::<f32>()
            .map_err(|e| DmsError::Inference(e.to_string()))?;

        let detections = decode_boxes(scores, boxes, img_w, img_h, &self.config)?;
        debug!("{} detector found {} regions", self.name, detections.len());
        Ok(detections)
    }
}

/// Turn raw score/box buffers into filtered, suppressed detections
pub fn decode_boxes(
    scores: &[f32],
    boxes: &[f32],
    img_w: u32,
    img_h: u32,
    config: &DetectorConfig,
) -> Result<Vec<Detection>, DmsError> {
    let anchors = scores.len() / 2;
    if boxes.len() != anchors * 4 {
        return Err(DmsError::Inference(format!(
            "score/box mismatch: {} scores, {} box values",
            scores.len(),
            boxes.len()
        )));
    }

    let mut candidates = Vec::new();
    for i in 0..anchors {
        let confidence = scores[i * 2 + 1];
        if confidence < config.score_threshold {
            continue;
        }

        let b = &boxes[i * 4..i * 4 + 4];
        let x1 = (b[0].clamp(0.0, 1.0) * img_w as f32).round() as u32;
        let y1 = (b[1].clamp(0.0, 1.0) * img_h as f32).round() as u32;
        let x2 = (b[2].clamp(0.0, 1.0) * img_w as f32).round() as u32;
        let y2 = (b[3].clamp(0.0, 1.0) * img_h as f32).round() as u32;
        if x2 <= x1 || y2 <= y1 {
            continue;
        }

        let region = Region::new(x1, y1, x2 - x1, y2 - y1);
        if region.width < config.min_size || region.height < config.min_size {
            continue;
        }
        if let Some(region) = region.clamp_to(img_w, img_h) {
            candidates.push(Detection::new(region, confidence));
        }
    }

    Ok(non_max_suppression(candidates, config.iou_threshold))
}

/// Greedy NMS; output sorted by descending confidence
pub fn non_max_suppression(mut candidates: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
    candidates.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut kept: Vec<Detection> = Vec::new();
    for candidate in candidates {
        if kept
            .iter()
            .all(|k| iou(&k.region, &candidate.region) <= iou_threshold)
        {
            kept.push(candidate);
        }
    }
    kept
}

/// Intersection over union of two regions
pub fn iou(a: &Region, b: &Region) -> f32 {
    let x1 = a.x.max(b.x);
    let y1 = a.y.max(b.y);
    let x2 = (a.x + a.width).min(b.x + b.width);
    let y2 = (a.y + a.height).min(b.y + b.height);
    if x2 <= x1 || y2 <= y1 {
        return 0.0;
    }

    let inter = ((x2 - x1) as u64 * (y2 - y1) as u64) as f32;
    let area_a = (a.width as u64 * a.height as u64) as f32;
    let area_b = (b.width as u64 * b.height as u64) as f32;
    inter / (area_a + area_b - inter)
}
