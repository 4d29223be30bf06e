//! Integration test: Server API endpoints

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use lumina::server::{create_router, AppState, ServerConfig};
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

const BOUNDARY: &str = "lumina-test-boundary";

fn test_app() -> (TempDir, axum::Router) {
    let dir = tempfile::tempdir().unwrap();
    let config = ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        data_dir: dir.path().join("uploads"),
        models_dir: dir.path().join("models"),
        max_upload_size: 10 * 1024 * 1024,
    };
    let state = Arc::new(AppState::new(config.clone()).unwrap());
    (dir, create_router(state, &config))
}

fn regression_csv(n: usize) -> String {
    let mut csv = String::from("a,b,y\n");
    for i in 0..n {
        csv.push_str(&format!("{},{},{}\n", i, (i * 3) % 7, 100 * i + (i * 3) % 7));
    }
    csv
}

fn multipart_request(uri: &str, file_name: &str, content: &str, target: Option<&str>) -> Request<Body> {
    let mut body = String::new();
    body.push_str(&format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n{content}\r\n"
    ));
    if let Some(target) = target {
        body.push_str(&format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"target\"\r\n\r\n{target}\r\n"
        ));
    }
    body.push_str(&format!("--{BOUNDARY}--\r\n"));

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
        .body(Body::from(body))
        .unwrap()
}

fn json_request(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health_endpoint() {
    let (_dir, app) = test_app();
    let response = app
        .oneshot(Request::builder().uri("/api/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["model_loaded"], false);
}

#[tokio::test]
async fn test_unknown_route() {
    let (_dir, app) = test_app();
    let response = app
        .oneshot(Request::builder().uri("/api/nope").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["error"], true);
}

#[tokio::test]
async fn test_wrong_method() {
    let (_dir, app) = test_app();
    let response = app
        .oneshot(Request::builder().uri("/api/predict").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_predict_without_model() {
    let (_dir, app) = test_app();
    let response = app
        .oneshot(json_request("/api/predict", json!({"records": [{"a": 1}]})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], true);
}

#[tokio::test]
async fn test_model_without_training() {
    let (_dir, app) = test_app();
    let response = app
        .oneshot(Request::builder().uri("/api/model").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_analyze_then_predict() {
    let (_dir, app) = test_app();

    let response = app
        .clone()
        .oneshot(multipart_request("/api/analyze", "sales.csv", &regression_csv(30), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["model"]["target"], "y");
    assert_eq!(body["model"]["features"], json!(["a", "b"]));
    assert!(body["insights"]["model_score"].is_number());
    assert!(body["charts"].is_array());

    let response = app
        .clone()
        .oneshot(json_request("/api/predict", json!([{"a": 3, "b": 2}, {"a": 20}])))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["predictions"].as_array().unwrap().len(), 2);

    let response = app
        .oneshot(Request::builder().uri("/api/model").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["target"], "y");
}

#[tokio::test]
async fn test_analyze_with_explicit_target() {
    let (_dir, app) = test_app();
    let response = app
        .oneshot(multipart_request("/api/analyze", "sales.csv", &regression_csv(30), Some("a")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["model"]["target"], "a");
}

#[tokio::test]
async fn test_analyze_too_small() {
    let (_dir, app) = test_app();
    let csv = "age,income,city\n25,50000,NY\n30,60000,LA\n25,50000,NY\n";
    let response = app
        .oneshot(multipart_request("/api/analyze", "people.csv", csv, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["message"].as_str().unwrap().contains("Insufficient data"));
}

#[tokio::test]
async fn test_predict_empty_records() {
    let (_dir, app) = test_app();
    let response = app
        .oneshot(json_request("/api/predict", json!({"records": []})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_predict_malformed_json_uses_error_body() {
    let (_dir, app) = test_app();
    let request = Request::builder()
        .method("POST")
        .uri("/api/predict")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"records\": [{\"a\": 1"))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], true);
    assert!(body["message"].is_string());

    let request = Request::builder()
        .method("POST")
        .uri("/api/predict")
        .body(Body::from("[]"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], true);
}

#[tokio::test]
async fn test_clean_returns_attachment() {
    let (_dir, app) = test_app();
    let csv = "name,score\n alice ,10\nbob,\n alice ,10\ncarol,30\n";
    let response = app
        .oneshot(multipart_request("/api/clean", "scores.csv", csv, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let disposition = response.headers()[header::CONTENT_DISPOSITION].to_str().unwrap().to_string();
    assert!(disposition.contains("cleaned_scores.csv"));

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "name,score");
    assert_eq!(lines.len(), 4);
    assert!(lines.iter().any(|l| l.starts_with("bob,20")));
}

#[tokio::test]
async fn test_unsupported_upload() {
    let (_dir, app) = test_app();
    let response = app
        .oneshot(multipart_request("/api/clean", "notes.txt", "hello", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_missing_file_field() {
    let (_dir, app) = test_app();
    let body = format!("--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"target\"\r\n\r\ny\r\n--{BOUNDARY}--\r\n");
    let request = Request::builder()
        .method("POST")
        .uri("/api/analyze")
        .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
        .body(Body::from(body))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_descriptive_statistics() {
    let (_dir, app) = test_app();
    let csv = "city,temp\nNY,10\nLA,20\nNY,30\n";
    let response = app
        .oneshot(multipart_request("/api/descriptive_statistics", "weather.csv", csv, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let stats = body["descriptive_statistics"].as_array().unwrap();
    assert_eq!(stats.len(), 2);
    assert_eq!(stats[0]["column"], "city");
    assert_eq!(stats[0]["top"], "NY");
    assert_eq!(stats[1]["mean"], 20.0);
}
