//! Router tests driven through `tower::ServiceExt::oneshot` with stub detectors

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use dms::{Detection, DmsConfig, DmsError, DmsModule, Region, RegionDetector};
use drowsiness_api::{create_router, AppState, FrameSettings};
use frame_codec::Frame;
use image::{GrayImage, ImageFormat, Rgb, RgbImage};
use serde_json::{json, Value};
use std::io::Cursor;
use std::sync::Arc;
use tower::ServiceExt;

/// Returns the same regions for every image
struct FixedDetector(Vec<Region>);

impl RegionDetector for FixedDetector {
    fn detect(&self, _image: &GrayImage) -> Result<Vec<Detection>, DmsError> {
        Ok(self.0.iter().map(|r| Detection::new(*r, 0.9)).collect())
    }
}

fn app(faces: Vec<Region>, eyes: Vec<Region>) -> (Router, Arc<AppState>) {
    let module = DmsModule::with_detectors(
        DmsConfig::default(),
        Box::new(FixedDetector(faces)),
        Box::new(FixedDetector(eyes)),
    );
    let state = Arc::new(AppState::new(module, FrameSettings::default(), None));
    (create_router(Arc::clone(&state)), state)
}

fn png_data_url(width: u32, height: u32) -> String {
    let img = RgbImage::from_pixel(width, height, Rgb([90, 120, 150]));
    let mut bytes = Vec::new();
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    format!("data:image/png;base64,{}", STANDARD.encode(bytes))
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

async fn post_detect(app: &Router, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri("/detect")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    send(app, request).await
}

#[tokio::test]
async fn test_missing_image_is_bad_request() {
    let (app, _) = app(vec![], vec![]);

    let (status, body) = post_detect(&app, json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No image data provided");

    let (status, body) = post_detect(&app, json!({ "image": "" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No image data provided");
}

#[tokio::test]
async fn test_non_json_body_is_bad_request() {
    let (app, _) = app(vec![], vec![]);
    let request = Request::builder()
        .method("POST")
        .uri("/detect")
        .header("content-type", "application/json")
        .body(Body::from("not json"))
        .unwrap();

    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_undecodable_image_leaves_tracker_untouched() {
    let (app, state) = app(vec![Region::new(10, 10, 40, 40)], vec![]);

    // Push the counter to 1 first
    let (status, _) = post_detect(&app, json!({ "image": png_data_url(64, 48) })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(state.tracker.lock().await.counter(), 1);

    let (status, body) = post_detect(&app, json!({ "image": "data:image/png;base64,!!!!" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Could not decode image");

    let garbage = STANDARD.encode(b"plain text, not pixels");
    let (status, body) = post_detect(&app, json!({ "image": garbage })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Could not decode image");

    assert_eq!(state.tracker.lock().await.counter(), 1);
}

#[tokio::test]
async fn test_no_faces_returns_annotated_frame() {
    let (app, state) = app(vec![], vec![]);

    let (status, body) = post_detect(&app, json!({ "image": png_data_url(64, 48) })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["drowsiness_detected"], false);

    let processed = body["processed_image"].as_str().unwrap();
    assert!(processed.starts_with("data:image/jpeg;base64,"));
    let frame = Frame::from_data_url(processed).unwrap();
    assert_eq!((frame.width(), frame.height()), (64, 48));

    assert_eq!(state.tracker.lock().await.counter(), 0);
}

#[tokio::test]
async fn test_wide_frames_are_downscaled() {
    let (app, _) = app(vec![], vec![]);

    let (status, body) = post_detect(&app, json!({ "image": png_data_url(1280, 720) })).await;
    assert_eq!(status, StatusCode::OK);

    let frame = Frame::from_data_url(body["processed_image"].as_str().unwrap()).unwrap();
    assert_eq!((frame.width(), frame.height()), (640, 360));
}

#[tokio::test]
async fn test_missing_eyes_raise_alert_on_fifteenth_frame() {
    let (app, _) = app(vec![Region::new(10, 10, 40, 40)], vec![Region::new(5, 5, 20, 20)]);
    let image = png_data_url(64, 48);

    for _ in 0..14 {
        let (status, body) = post_detect(&app, json!({ "image": image })).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["drowsiness_detected"], false);
    }
    let (_, status_body) = get_json(&app, "/check_drowsiness").await;
    assert_eq!(status_body["drowsiness_detected"], false);

    let (_, body) = post_detect(&app, json!({ "image": image })).await;
    assert_eq!(body["drowsiness_detected"], true);

    let (status, status_body) = get_json(&app, "/check_drowsiness").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(status_body["drowsiness_detected"], true);
}

#[tokio::test]
async fn test_open_eyes_keep_flag_down() {
    // Two tall eye boxes inside the face: openness well above 0.3
    let (app, state) = app(
        vec![Region::new(4, 4, 50, 40)],
        vec![Region::new(2, 2, 10, 20), Region::new(20, 2, 10, 20)],
    );
    let image = png_data_url(64, 48);

    for _ in 0..20 {
        let (status, body) = post_detect(&app, json!({ "image": image })).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["drowsiness_detected"], false);
    }
    assert_eq!(state.tracker.lock().await.counter(), 0);
}

#[tokio::test]
async fn test_health_reports_tracker() {
    let (app, _) = app(vec![Region::new(10, 10, 40, 40)], vec![]);
    post_detect(&app, json!({ "image": png_data_url(64, 48) })).await;

    let (status, body) = get_json(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["tracker"]["counter"], 1);
    assert_eq!(body["tracker"]["threshold"], 15);
    assert_eq!(body["tracker"]["drowsy"], false);
}

#[tokio::test]
async fn test_metrics_without_recorder_is_not_found() {
    let (app, _) = app(vec![], vec![]);
    let request = Request::builder().uri("/metrics").body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
