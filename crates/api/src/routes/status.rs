//! Status, Health, and Metrics Routes

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::sync::Arc;

use crate::AppState;

/// Response for the drowsiness status endpoint
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub drowsiness_detected: bool,
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: u64,
    pub version: String,
    pub uptime_seconds: u64,
    pub tracker: TrackerStatus,
}

/// Tracker snapshot
#[derive(Debug, Serialize)]
pub struct TrackerStatus {
    pub counter: u32,
    pub threshold: u32,
    pub drowsy: bool,
}

/// Last computed drowsiness flag
pub async fn check_drowsiness(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let tracker = state.tracker.lock().await;
    Json(StatusResponse {
        drowsiness_detected: tracker.is_drowsy(),
    })
}

/// Health check handler
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    let tracker = {
        let tracker = state.tracker.lock().await;
        TrackerStatus {
            counter: tracker.counter(),
            threshold: state.module.config().consec_frames,
            drowsy: tracker.is_drowsy(),
        }
    };

    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp,
        version: state.version.clone(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        tracker,
    })
}

/// Prometheus exposition, when a recorder is installed
pub async fn metrics(State(state): State<Arc<AppState>>) -> Response {
    match &state.metrics {
        Some(handle) => handle.render().into_response(),
        None => (StatusCode::NOT_FOUND, "metrics recorder not installed").into_response(),
    }
}
