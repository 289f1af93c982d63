//! Live WebSocket Session Tests
//!
//! Drive a served hub with a real client to exercise the read deadline,
//! close frames and the disconnect cascade.

use std::net::SocketAddr;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use pretty_assertions::assert_eq;
use realtime_hub::config::Settings;
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::common::{eventually, TestApp};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

const TIMEOUT: Duration = Duration::from_secs(5);

async fn connect(app: &TestApp, addr: SocketAddr, subject: &str) -> WsStream {
    let url = format!("ws://{}/ws?token={}", addr, app.token(subject));
    let (ws, _) = connect_async(url).await.unwrap();
    ws
}

async fn wait_for_connections(app: &TestApp, expected: usize) {
    let hub = app.state.hub.clone();
    assert!(
        eventually(|| {
            let hub = hub.clone();
            async move { hub.stats().await.unwrap().connections == expected }
        })
        .await,
        "expected {} live connections",
        expected
    );
}

/// Read text frames until one has the given type.
async fn read_until_type(ws: &mut WsStream, kind: &str) -> Value {
    timeout(TIMEOUT, async {
        loop {
            let message = ws.next().await.unwrap().unwrap();
            if let Message::Text(text) = message {
                let value: Value = serde_json::from_str(&text).unwrap();
                if value["type"] == kind {
                    return value;
                }
            }
        }
    })
    .await
    .unwrap()
}

async fn send_json(ws: &mut WsStream, value: Value) {
    ws.send(Message::text(value.to_string())).await.unwrap();
}

#[tokio::test]
async fn test_ping_is_answered_over_socket() {
    let app = TestApp::new().await;
    let addr = app.serve().await;
    let mut ws = connect(&app, addr, "42").await;

    send_json(&mut ws, json!({"type": "ping"})).await;

    assert_eq!(read_until_type(&mut ws, "pong").await, json!({"type": "pong"}));
}

#[tokio::test]
async fn test_silent_peer_is_torn_down_and_leaves_roster() {
    let mut settings = Settings::default();
    settings.websocket.pong_wait_secs = 1;
    let app = TestApp::with_settings(settings).await;
    let addr = app.serve().await;

    let mut ws = connect(&app, addr, "42").await;
    send_json(&mut ws, json!({"type": "voice-join", "channel_id": "v1", "username": "alice"})).await;

    let voice = app.state.voice.clone();
    assert!(
        eventually(|| {
            let voice = voice.clone();
            async move { voice.get_participants("v1").len() == 1 }
        })
        .await
    );

    // The client stays connected but never reads, so pings go unanswered
    let voice = app.state.voice.clone();
    assert!(
        eventually(|| {
            let voice = voice.clone();
            async move { voice.channel_count() == 0 }
        })
        .await,
        "read deadline did not tear the session down"
    );
    wait_for_connections(&app, 0).await;

    drop(ws);
}

#[tokio::test]
async fn test_evicted_connection_receives_close_frame() {
    let app = TestApp::new().await;
    let addr = app.serve().await;

    let mut first = connect(&app, addr, "42").await;
    wait_for_connections(&app, 1).await;
    let mut second = connect(&app, addr, "42").await;

    let closed = timeout(TIMEOUT, async {
        while let Some(message) = first.next().await {
            match message {
                Ok(Message::Close(_)) => return true,
                Ok(_) => continue,
                Err(_) => return false,
            }
        }
        false
    })
    .await
    .unwrap();
    assert!(closed, "evicted connection ended without a close frame");

    // The newer connection is still served
    send_json(&mut second, json!({"type": "ping"})).await;
    read_until_type(&mut second, "pong").await;
    wait_for_connections(&app, 1).await;
}

#[tokio::test]
async fn test_client_close_announces_voice_leave() {
    let app = TestApp::new().await;
    let addr = app.serve().await;

    let mut bob = connect(&app, addr, "7").await;
    wait_for_connections(&app, 1).await;
    let mut alice = connect(&app, addr, "42").await;
    wait_for_connections(&app, 2).await;

    send_json(&mut alice, json!({"type": "voice-join", "channel_id": "v1", "avatar": null})).await;
    let join = read_until_type(&mut bob, "voice-join").await;
    assert_eq!(join["fromUserId"], "42");

    alice.close(None).await.unwrap();

    let leave = read_until_type(&mut bob, "voice-leave").await;
    assert_eq!(leave["channel_id"], "v1");
    assert_eq!(leave["fromUserId"], "42");
    assert!(app.state.voice.get_participants("v1").is_empty());
}
