//! Eye openness heuristic
//!
//! A stand-in for the landmark-based eye aspect ratio: the eye box's
//! height/width ratio, scaled by how bright the eye region is.

use image::GrayImage;

/// Openness score of one grayscale eye crop.
///
/// `score = (height / width) * (0.7 + 0.3 * mean / 255)`; an empty crop
/// scores exactly 0.
pub fn openness_score(eye: &GrayImage) -> f32 {
    let (width, height) = eye.dimensions();
    if width == 0 || height == 0 {
        return 0.0;
    }

    let geometric_ratio = height as f64 / width as f64;
    let brightness_factor = 0.7 + 0.3 * mean_brightness(eye);

    (geometric_ratio * brightness_factor) as f32
}

/// Mean pixel intensity normalized to [0, 1]
fn mean_brightness(eye: &GrayImage) -> f64 {
    let pixels = eye.as_raw();
    if pixels.is_empty() {
        return 0.0;
    }
    let sum: u64 = pixels.iter().map(|&p| p as u64).sum();
    (sum as f64 / pixels.len() as f64 / 255.0).clamp(0.0, 1.0)
}
