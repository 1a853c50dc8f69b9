//! Drowsiness Detection API Server
//!
//! Accepts webcam frames as base64 JSON, runs face/eye detection and the
//! drowsiness tracker, and returns the annotated frame with an alert flag.

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use dms::{DmsModule, DrowsinessTracker};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::Arc;
use tokio::sync::Mutex;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn, Level};

pub mod config;
pub mod error;
mod routes;

pub use config::{FrameSettings, LoggingSettings, ServerSettings, Settings};
pub use error::ApiError;
pub use routes::detect::{DetectRequest, DetectResponse};
pub use routes::status::{HealthResponse, StatusResponse};

/// Application state shared across handlers
pub struct AppState {
    /// Detectors and thresholds
    pub module: DmsModule,
    /// Consecutive-closed counter and drowsiness flag, guarded together
    pub tracker: Mutex<DrowsinessTracker>,
    /// Frame decode/encode settings
    pub frame: FrameSettings,
    /// Version string
    pub version: String,
    /// Start time
    pub start_time: std::time::Instant,
    /// Prometheus handle, if a recorder was installed
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Create new application state
    pub fn new(module: DmsModule, frame: FrameSettings, metrics: Option<PrometheusHandle>) -> Self {
        Self {
            module,
            tracker: Mutex::new(DrowsinessTracker::new()),
            frame,
            version: env!("CARGO_PKG_VERSION").to_string(),
            start_time: std::time::Instant::now(),
            metrics,
        }
    }
}

/// Create the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    let body_limit = state.frame.max_body_bytes;

    Router::new()
        .route("/detect", post(routes::detect::detect))
        .route("/check_drowsiness", get(routes::status::check_drowsiness))
        .route("/health", get(routes::status::health))
        .route("/metrics", get(routes::status::metrics))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .layer(DefaultBodyLimit::max(body_limit)),
        )
        .with_state(state)
}

/// Initialize logging at an already-validated level
pub fn init_logging(level: Level, json: bool) {
    let builder = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(true);

    let result = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    if let Err(e) = result {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Install the global Prometheus recorder
fn install_metrics() -> Option<PrometheusHandle> {
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => Some(handle),
        Err(e) => {
            warn!("Metrics recorder not installed: {}", e);
            None
        }
    }
}

/// Run the server
///
/// Detector models are loaded before binding; a load failure aborts startup.
pub async fn run_server(settings: Settings) -> Result<(), Box<dyn std::error::Error>> {
    settings.validate()?;

    let module = DmsModule::new(settings.detection.clone())?;
    info!(
        "Detectors loaded (ear_threshold={}, consec_frames={})",
        settings.detection.ear_threshold, settings.detection.consec_frames
    );

    let state = Arc::new(AppState::new(module, settings.frame.clone(), install_metrics()));
    let app = create_router(state);

    let addr = settings.server.bind_addr();
    info!("Starting drowsiness detection server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
