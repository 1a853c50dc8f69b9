//! API error type and its JSON response mapping

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use dms::DmsError;
use frame_codec::FrameError;
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

/// Errors surfaced to HTTP clients as `{"error": ...}`
#[derive(Error, Debug)]
pub enum ApiError {
    /// Missing or empty `image` field (or a body that is not JSON)
    #[error("No image data provided")]
    MissingImage,

    /// Payload was present but is not a decodable image
    #[error("Could not decode image")]
    InvalidImage(#[source] FrameError),

    /// Anything else: detector, encoder, or worker failure
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingImage | ApiError::InvalidImage(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            ApiError::MissingImage => "missing_image",
            ApiError::InvalidImage(_) => "invalid_image",
            ApiError::Internal(_) => "internal",
        }
    }
}

impl From<FrameError> for ApiError {
    fn from(err: FrameError) -> Self {
        match err {
            FrameError::Base64(_) | FrameError::Decode(_) => ApiError::InvalidImage(err),
            FrameError::Encode(msg) => ApiError::Internal(format!("Could not encode image: {}", msg)),
        }
    }
}

impl From<DmsError> for ApiError {
    fn from(err: DmsError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::InvalidImage(source) => warn!("Rejected frame: {}", source),
            ApiError::MissingImage => warn!("Rejected request without image data"),
            ApiError::Internal(msg) => error!("Frame processing failed: {}", msg),
        }
        metrics::counter!("frame_errors_total", "kind" => self.kind()).increment(1);

        (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}
