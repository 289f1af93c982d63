//! Collaboration API Tests

use std::time::Duration;

use axum::http::StatusCode;
use pretty_assertions::assert_eq;
use realtime_hub::domain::Identity;
use serde_json::{json, Value};

use crate::common::{json_body, TestApp};

fn element_added(element_id: &str) -> Value {
    json!({
        "type": "element_added",
        "element_id": element_id,
        "data": {"shape": "rect", "x": 10, "y": 20}
    })
}

/// Snapshots are written in the background; poll until `expected` versions exist.
async fn versions_eventually(app: &TestApp, document_id: &str, token: &str, expected: usize) -> Value {
    for _ in 0..100 {
        let response = app
            .get_auth(&format!("/api/collab/{}/versions", document_id), token)
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        if json["versions"].as_array().map(Vec::len) == Some(expected) {
            return json;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("expected {} versions of {}", expected, document_id);
}

#[tokio::test]
async fn test_collab_routes_require_token() {
    let app = TestApp::new().await;

    let response = app.get("/api/collab/doc-1/participants").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .post_json(
            "/api/collab/sync",
            &json!({"document_id": "doc-1", "update": element_added("e1")}),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_participants_query_does_not_create_session() {
    let app = TestApp::new().await;
    let token = app.token("42");

    let response = app
        .get_auth("/api/collab/doc-unknown/participants", &token)
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["document_id"], "doc-unknown");
    assert_eq!(json["count"], 0);
    assert_eq!(app.state.collaboration.session_count(), 0);
}

#[tokio::test]
async fn test_participants_are_listed() {
    let app = TestApp::new().await;
    let collaboration = &app.state.collaboration;
    let session = collaboration.get_or_create("doc-1");
    let _alice = collaboration.add_participant(&session, Identity::new("42"), "alice");
    let _bob = collaboration.add_participant(&session, Identity::new("7"), "bob");

    let token = app.token("42");
    let json = json_body(app.get_auth("/api/collab/doc-1/participants", &token).await).await;

    assert_eq!(json["count"], 2);
    let users = json["users"].as_array().unwrap();
    let names: Vec<&str> = users.iter().filter_map(|u| u["username"].as_str()).collect();
    assert!(names.contains(&"alice"));
    assert!(names.contains(&"bob"));
}

#[tokio::test]
async fn test_sync_update_reaches_participants_and_records_version() {
    let app = TestApp::new().await;
    let collaboration = &app.state.collaboration;
    let session = collaboration.get_or_create("doc-2");
    let mut viewer = collaboration.add_participant(&session, Identity::new("7"), "bob");

    let token = app.token("42");
    let response = app
        .post_json_auth(
            "/api/collab/sync",
            &json!({"document_id": "doc-2", "update": element_added("e1")}),
            &token,
        )
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["delivered"], 1);
    assert_eq!(json["dropped"], 0);

    let event = viewer.events.recv().await.unwrap();
    assert_eq!(event["type"], "update");
    assert_eq!(event["update"]["element_id"], "e1");
    assert_eq!(event["update"]["user_id"], "42");

    let history = versions_eventually(&app, "doc-2", &token, 1).await;
    let version = &history["versions"][0];
    assert_eq!(version["version_number"], 1);
    assert_eq!(version["changed_by"], "42");
    assert_eq!(version["change_description"], "element_added");
}

#[tokio::test]
async fn test_sync_accepts_numeric_tool_id() {
    let app = TestApp::new().await;
    let token = app.token("42");

    let response = app
        .post_json_auth(
            "/api/collab/sync",
            &json!({"tool_id": 55, "update": element_added("e1")}),
            &token,
        )
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(app.state.collaboration.get("55").is_some());
}

#[tokio::test]
async fn test_sync_rejects_malformed_update() {
    let app = TestApp::new().await;
    let token = app.token("42");

    let response = app
        .post_json_auth(
            "/api/collab/sync",
            &json!({"document_id": "doc-3", "update": {"type": "teleported"}}),
            &token,
        )
        .await;

    assert!(response.status().is_client_error());
    assert_eq!(app.state.collaboration.session_count(), 0);
}

#[tokio::test]
async fn test_rest_cursor_excludes_sender() {
    let app = TestApp::new().await;
    let collaboration = &app.state.collaboration;
    let session = collaboration.get_or_create("doc-4");
    let mut author = collaboration.add_participant(&session, Identity::new("42"), "alice");
    let mut viewer = collaboration.add_participant(&session, Identity::new("7"), "bob");

    let token = app.token("42");
    let response = app
        .post_json_auth(
            "/api/collab/doc-4/cursor",
            &json!({"x": 1.5, "y": 2.5, "color": "#ff0000"}),
            &token,
        )
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["delivered"], 1);

    let event = viewer.events.recv().await.unwrap();
    assert_eq!(event["type"], "cursor");
    assert_eq!(event["cursor"]["user_id"], "42");
    assert_eq!(event["cursor"]["x"], 1.5);
    assert!(author.events.try_recv().is_err());
}

#[tokio::test]
async fn test_rest_cursor_for_unknown_document_is_noop() {
    let app = TestApp::new().await;
    let token = app.token("42");

    let response = app
        .post_json_auth("/api/collab/nowhere/cursor", &json!({"x": 0.0, "y": 0.0}), &token)
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["delivered"], 0);
    assert_eq!(app.state.collaboration.session_count(), 0);
}
