//! Health Check API Tests

use axum::http::StatusCode;
use pretty_assertions::assert_eq;

use crate::common::{json_body, TestApp};

/// Test basic health check endpoint returns 200 OK
#[tokio::test]
async fn test_health_check_returns_ok() {
    let app = TestApp::new().await;

    let response = app.get("/health").await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
}

/// Test liveness probe endpoint
#[tokio::test]
async fn test_liveness_probe() {
    let app = TestApp::new().await;

    let response = app.get("/health/live").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["status"], "alive");
}

/// Readiness without PostgreSQL or Redis is still healthy
#[tokio::test]
async fn test_readiness_without_optional_dependencies() {
    let app = TestApp::new().await;

    let response = app.get("/health/ready").await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["checks"]["database"]["message"], "not configured");
    assert_eq!(json["checks"]["redis"]["message"], "not configured");
    assert_eq!(json["checks"]["hub"]["status"], "healthy");
    assert_eq!(json["checks"]["hub"]["active_connections"], 0);
}

#[tokio::test]
async fn test_metrics_endpoint_is_public() {
    let app = TestApp::new().await;
    app.get("/health").await;

    let response = app.get("/metrics").await;

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("realtime_hub_http_requests_total"));
}
