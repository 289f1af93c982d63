//! WebSocket Upgrade Tests
//!
//! Authentication happens before the upgrade, so these run over plain requests.

use axum::http::StatusCode;
use test_case::test_case;

use crate::common::TestApp;

#[test_case("/ws" ; "hub socket")]
#[test_case("/ws/collab/doc-1" ; "collaboration socket")]
#[tokio::test]
async fn test_upgrade_without_token_rejected(uri: &str) {
    let app = TestApp::new().await;

    let response = app.get(uri).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[test_case("/ws?token=garbage" ; "hub socket")]
#[test_case("/ws/collab/doc-1?token=garbage" ; "collaboration socket")]
#[tokio::test]
async fn test_upgrade_with_bad_token_rejected(uri: &str) {
    let app = TestApp::new().await;

    let response = app.get(uri).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_valid_token_without_upgrade_headers_is_not_unauthorized() {
    let app = TestApp::new().await;
    let token = app.token("42");

    let response = app.get(&format!("/ws?token={}", token)).await;

    assert_ne!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(response.status().is_client_error());
}
