mod common;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

use common::{guard_transcript, Harness};
use keyword_clipper::api::{router, AppState};

fn app(harness: &Harness) -> Router {
    router(AppState::new(Arc::new(harness.pipeline()), harness.tracker.clone()))
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, headers, body.to_vec())
}

fn json_post(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn form_post(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_health() {
    let harness = Harness::new(guard_transcript(), 250.0);
    let (status, _, body) = send(&app(&harness), get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["busy"], false);
}

#[tokio::test]
async fn test_json_run_then_download() {
    let harness = Harness::new(guard_transcript(), 250.0);
    let app = app(&harness);

    let request = json_post(
        "/api/runs",
        serde_json::json!({"source": "https://example.com/v", "keyword": "Guard"}),
    );
    let (status, _, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);

    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["success"], true);
    assert_eq!(json["data"]["clips"].as_array().unwrap().len(), 3);
    let run_id = json["data"]["run_id"].as_str().unwrap().to_string();

    let (status, headers, body) = send(&app, get(&format!("/files/{}/clip_1.mp4", run_id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "video/mp4");
    assert_eq!(
        headers[header::CONTENT_DISPOSITION],
        "attachment; filename=\"clip_1.mp4\"; filename*=UTF-8''clip_1.mp4"
    );
    assert_eq!(body, b"fake clip");

    let (status, _, _) = send(&app, get(&format!("/files/{}/run.json", run_id))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _, body) = send(&app, get("/api/runs")).await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["data"][0]["run_id"], run_id.as_str());
    assert_eq!(json["data"][0]["manifest"]["outcome"]["status"], "completed");
}

#[tokio::test]
async fn test_json_run_rejects_blank_keyword() {
    let harness = Harness::new(guard_transcript(), 250.0);
    let request = json_post("/api/runs", serde_json::json!({"source": "https://example.com/v", "keyword": "  "}));

    let (status, _, body) = send(&app(&harness), request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["success"], false);
    assert!(json["error"].as_str().unwrap().contains("keyword"));
}

#[tokio::test]
async fn test_json_run_while_busy_conflicts() {
    let harness = Harness::new(guard_transcript(), 250.0);
    let app = app(&harness);
    let _held = harness.tracker.begin().unwrap();

    let request = json_post("/api/runs", serde_json::json!({"source": "https://example.com/v", "keyword": "guard"}));
    let (status, _, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, _, body) = send(&app, get("/api/status")).await;
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["data"]["busy"], true);
    assert_eq!(json["data"]["active"]["stage"], "idle");
}

#[tokio::test]
async fn test_form_submit_redirects_to_downloads() {
    let harness = Harness::new(guard_transcript(), 250.0);
    let app = app(&harness);

    let (status, headers, _) = send(
        &app,
        form_post("source=https%3A%2F%2Fexample.com%2Fv&keyword=guard&subtitles=on&duration=60"),
    )
    .await;
    assert_eq!(status, StatusCode::SEE_OTHER);
    assert_eq!(headers[header::LOCATION], "/download");

    let (status, _, body) = send(&app, get("/download")).await;
    assert_eq!(status, StatusCode::OK);
    let html = String::from_utf8(body).unwrap();
    assert!(html.contains("clip_1.mp4"));

    let windows: Vec<f64> = harness.cut_calls().iter().map(|cut| cut.window.end - cut.window.start).collect();
    assert_eq!(windows[0], 60.0);
    assert!(harness.cut_calls().iter().all(|cut| cut.subtitles.is_some()));
}

#[tokio::test]
async fn test_form_error_re_renders_form() {
    let harness = Harness::new(guard_transcript(), 250.0);

    let (status, _, body) = send(&app(&harness), form_post("source=https%3A%2F%2Fexample.com%2Fv&keyword=")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let html = String::from_utf8(body).unwrap();
    assert!(html.contains("a keyword is required"));
    assert!(html.contains("https://example.com/v"));
}

#[tokio::test]
async fn test_cancel_when_idle() {
    let harness = Harness::new(guard_transcript(), 250.0);
    let request = Request::builder()
        .method("POST")
        .uri("/api/runs/cancel")
        .body(Body::empty())
        .unwrap();

    let (status, _, body) = send(&app(&harness), request).await;

    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["data"]["cancel_requested"], false);
}
