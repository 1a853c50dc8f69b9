//! Frame types and processing

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{GrayImage, Luma, RgbImage};
use tracing::debug;

use crate::FrameError;

/// Prefix attached to every processed frame returned to the browser
pub const JPEG_DATA_URL_PREFIX: &str = "data:image/jpeg;base64,";

/// Decoded RGB video frame
#[derive(Debug, Clone)]
pub struct Frame {
    image: RgbImage,
}

impl Frame {
    /// Wrap an already-decoded RGB image
    pub fn new(image: RgbImage) -> Self {
        Self { image }
    }

    /// Decode a data-URL-prefixed or raw base64 JPEG/PNG payload
    pub fn from_data_url(payload: &str) -> Result<Self, FrameError> {
        let bytes = decode_base64_payload(payload)?;
        Self::from_encoded(&bytes)
    }

    /// Decode an encoded image (any format the `image` crate recognizes)
    pub fn from_encoded(bytes: &[u8]) -> Result<Self, FrameError> {
        let decoded =
            image::load_from_memory(bytes).map_err(|e| FrameError::Decode(e.to_string()))?;
        let image = decoded.to_rgb8();
        debug!("Decoded {}x{} frame", image.width(), image.height());
        Ok(Self { image })
    }

    /// Frame width
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Frame height
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Borrow the underlying RGB image
    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    /// Mutably borrow the underlying RGB image (overlay drawing)
    pub fn image_mut(&mut self) -> &mut RgbImage {
        &mut self.image
    }

    /// Downscale frames wider than `max_width`, preserving aspect ratio.
    ///
    /// Frames at or below the limit are returned untouched.
    pub fn downscale_to_width(self, max_width: u32) -> Self {
        let (width, height) = self.image.dimensions();
        if width <= max_width || max_width == 0 {
            return self;
        }

        let scale = max_width as f64 / width as f64;
        let new_height = ((height as f64 * scale).round() as u32).max(1);
        debug!(
            "Downscaling frame {}x{} -> {}x{}",
            width, height, max_width, new_height
        );

        let image = image::imageops::resize(&self.image, max_width, new_height, FilterType::Triangle);
        Self { image }
    }

    /// Convert to grayscale
    pub fn to_grayscale(&self) -> GrayImage {
        let (width, height) = self.image.dimensions();
        GrayImage::from_fn(width, height, |x, y| {
            let pixel = self.image.get_pixel(x, y);
            // Luminance formula: 0.299*R + 0.587*G + 0.114*B
            let luma = pixel[0] as f32 * 0.299 + pixel[1] as f32 * 0.587 + pixel[2] as f32 * 0.114;
            Luma([luma.round().clamp(0.0, 255.0) as u8])
        })
    }

    /// Encode as JPEG bytes
    pub fn to_jpeg(&self, quality: u8) -> Result<Vec<u8>, FrameError> {
        let mut buffer = Vec::new();
        let mut encoder = JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100));
        encoder
            .encode_image(&self.image)
            .map_err(|e| FrameError::Encode(e.to_string()))?;
        Ok(buffer)
    }

    /// Encode as a `data:image/jpeg;base64,` URL
    pub fn to_jpeg_data_url(&self, quality: u8) -> Result<String, FrameError> {
        let jpeg = self.to_jpeg(quality)?;
        let mut url = String::with_capacity(JPEG_DATA_URL_PREFIX.len() + jpeg.len() * 4 / 3 + 4);
        url.push_str(JPEG_DATA_URL_PREFIX);
        STANDARD.encode_string(&jpeg, &mut url);
        Ok(url)
    }
}

/// Strip an optional `data:...;base64,` prefix and decode the rest.
///
/// With a comma present, only the segment following the first comma is used.
/// ASCII whitespace is ignored, so line-wrapped payloads decode.
pub fn decode_base64_payload(payload: &str) -> Result<Vec<u8>, FrameError> {
    let encoded = payload.split(',').nth(1).unwrap_or(payload);
    let compact: String = encoded.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    Ok(STANDARD.decode(compact)?)
}
