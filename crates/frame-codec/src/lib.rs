//! Frame codec for the drowsiness detection service
//!
//! Turns browser-captured payloads into RGB frames and back:
//! - Data-URL / raw base64 decoding
//! - JPEG and PNG image decoding
//! - Width-capped downscaling (640 px by default)
//! - JPEG re-encoding as a data URL

pub mod frame;

pub use frame::{Frame, JPEG_DATA_URL_PREFIX};

use thiserror::Error;

/// Default width above which incoming frames are downscaled
pub const DEFAULT_MAX_WIDTH: u32 = 640;

/// Default JPEG quality for processed frames
pub const DEFAULT_JPEG_QUALITY: u8 = 70;

/// Frame codec error types
#[derive(Error, Debug)]
pub enum FrameError {
    #[error("Invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Could not decode image: {0}")]
    Decode(String),

    #[error("Could not encode image: {0}")]
    Encode(String),
}
