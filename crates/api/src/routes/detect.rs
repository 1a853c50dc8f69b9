//! Frame Detection Route

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use dms::overlay;
use frame_codec::Frame;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

use crate::error::ApiError;
use crate::AppState;

/// Request body for the detect endpoint
#[derive(Debug, Deserialize)]
pub struct DetectRequest {
    /// Data-URL-prefixed or raw base64 JPEG/PNG
    #[serde(default)]
    pub image: Option<String>,
}

/// Response for the detect endpoint
#[derive(Debug, Serialize)]
pub struct DetectResponse {
    pub drowsiness_detected: bool,
    /// Annotated frame as `data:image/jpeg;base64,...`
    pub processed_image: String,
}

/// Decode, analyze, annotate, and re-encode one frame
pub async fn detect(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<DetectRequest>, JsonRejection>,
) -> Result<Json<DetectResponse>, ApiError> {
    let image = match payload {
        Ok(Json(DetectRequest { image: Some(image) })) if !image.is_empty() => image,
        Ok(_) => return Err(ApiError::MissingImage),
        Err(rejection) => {
            warn!("Unreadable detect body: {}", rejection.body_text());
            return Err(ApiError::MissingImage);
        }
    };

    let started = Instant::now();
    let worker = Arc::clone(&state);
    let response = tokio::task::spawn_blocking(move || process_frame(&worker, &image))
        .await
        .map_err(|e| ApiError::Internal(format!("Frame worker failed: {}", e)))??;

    metrics::histogram!("frame_processing_seconds").record(started.elapsed().as_secs_f64());
    Ok(Json(response))
}

/// Blocking frame pipeline.
///
/// Decode errors return before the tracker is touched; the tracker lock is
/// held only around `evaluate`.
fn process_frame(state: &AppState, payload: &str) -> Result<DetectResponse, ApiError> {
    let mut frame = Frame::from_data_url(payload)?.downscale_to_width(state.frame.max_width);
    let faces = state.module.observe(&frame)?;

    let evaluation = {
        let config = state.module.config();
        let mut tracker = state.tracker.blocking_lock();
        tracker.evaluate(&faces, config.consec_frames, config.ear_threshold)
    };

    metrics::counter!("frames_processed_total").increment(1);
    metrics::gauge!("closed_frame_counter").set(evaluation.counter as f64);
    if evaluation.drowsy {
        metrics::counter!("drowsiness_alerts_total").increment(1);
    }
    debug!(
        faces = faces.len(),
        counter = evaluation.counter,
        drowsy = evaluation.drowsy,
        "Frame analyzed"
    );

    overlay::render(&mut frame, &evaluation.annotations);
    let processed_image = frame.to_jpeg_data_url(state.frame.jpeg_quality)?;

    Ok(DetectResponse {
        drowsiness_detected: evaluation.drowsy,
        processed_image,
    })
}
