//! Voice Roster API Tests

use axum::http::StatusCode;
use pretty_assertions::assert_eq;
use realtime_hub::domain::Identity;

use crate::common::{json_body, TestApp};

#[tokio::test]
async fn test_participants_require_token() {
    let app = TestApp::new().await;

    let response = app.get("/api/voice/channels/v1/participants").await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_invalid_token_rejected() {
    let app = TestApp::new().await;

    let response = app
        .get_auth("/api/voice/channels/v1/participants", "not-a-jwt")
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_unknown_channel_is_empty() {
    let app = TestApp::new().await;
    let token = app.token("42");

    let response = app
        .get_auth("/api/voice/channels/nowhere/participants", &token)
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["channel_id"], "nowhere");
    assert_eq!(json["count"], 0);
    assert_eq!(json["participants"], serde_json::json!([]));
}

#[tokio::test]
async fn test_roster_is_listed() {
    let app = TestApp::new().await;
    let voice = &app.state.voice;
    voice.join("v1", Identity::new("42"), "alice", "", true, false);
    voice.join("v1", Identity::new("7"), "bob", "", false, false);
    voice.join("v2", Identity::new("9"), "carol", "", false, false);

    let token = app.token("42");
    let response = app
        .get_auth("/api/voice/channels/v1/participants", &token)
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["count"], 2);
    let participants = json["participants"].as_array().unwrap();
    assert_eq!(participants[0]["user_id"], "42");
    assert_eq!(participants[0]["is_muted"], true);
    assert_eq!(participants[1]["username"], "bob");
}
