//! WebSocket Connection Handler
//!
//! Authenticates the upgrade request, registers the connection with the hub
//! and pumps frames through the dispatcher until the socket ends.

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::{
        ws::{rejection::WebSocketUpgradeRejection, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use super::connection::Connection;
use super::dispatcher::Dispatcher;
use super::session::{self, FrameHandler, Liveness};
use crate::domain::Identity;
use crate::infrastructure::metrics;
use crate::presentation::middleware::{bearer_token, decode_identity};
use crate::shared::error::AppError;
use crate::startup::AppState;

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    pub token: Option<String>,
}

/// Resolve the identity of an upgrade request from `?token=` or a bearer header.
pub(crate) fn authenticate(
    state: &AppState,
    token: Option<&str>,
    headers: &HeaderMap,
) -> Result<Identity, AppError> {
    let token = token
        .filter(|t| !t.is_empty())
        .or_else(|| bearer_token(headers))
        .ok_or_else(|| AppError::Unauthorized("Missing token".into()))?;

    decode_identity(token, &state.settings.jwt.secret).inspect_err(|e| {
        tracing::info!(error = %e, "WebSocket connection rejected");
    })
}

/// WebSocket upgrade handler
pub async fn ws_handler(
    State(state): State<AppState>,
    Query(query): Query<WsQuery>,
    headers: HeaderMap,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let identity = match authenticate(&state, query.token.as_deref(), &headers) {
        Ok(identity) => identity,
        Err(e) => return e.into_response(),
    };
    let ws = match ws {
        Ok(ws) => ws,
        Err(rejection) => return rejection.into_response(),
    };

    let settings = &state.settings.websocket;
    ws.max_message_size(settings.max_message_size)
        .max_frame_size(settings.max_frame_size)
        .on_upgrade(move |socket| handle_socket(socket, state, identity))
}

/// Handle individual WebSocket connection
async fn handle_socket(socket: WebSocket, state: AppState, identity: Identity) {
    let (connection, outbound) =
        Connection::new(identity, state.settings.websocket.outbound_queue_capacity);

    if let Err(e) = state.dispatcher.hub().register(connection.clone()).await {
        tracing::warn!(user_id = %connection.identity(), error = %e, "Failed to register connection");
        return;
    }

    tracing::info!(
        user_id = %connection.identity(),
        connection_id = %connection.id(),
        "WebSocket connected"
    );

    let handler = HubFrameHandler {
        dispatcher: state.dispatcher.clone(),
        connection: connection.clone(),
    };
    let reason = session::run(
        socket,
        outbound,
        Liveness::from(&state.settings.websocket),
        &handler,
    )
    .await;

    let now = chrono::Utc::now();
    tracing::info!(
        user_id = %connection.identity(),
        connection_id = %connection.id(),
        reason = ?reason,
        dropped = connection.dropped(),
        connected_secs = (now - connection.connected_at()).num_seconds(),
        idle_ms = now.timestamp_millis() - connection.last_activity_millis(),
        "WebSocket disconnected"
    );
}

struct HubFrameHandler {
    dispatcher: Arc<Dispatcher>,
    connection: Arc<Connection>,
}

#[async_trait]
impl FrameHandler for HubFrameHandler {
    async fn on_text(&self, text: &str) {
        self.connection.touch();
        if let Err(e) = self.dispatcher.dispatch(&self.connection, text).await {
            metrics::record_malformed_event();
            tracing::debug!(
                user_id = %self.connection.identity(),
                error = %e,
                "Discarded malformed frame"
            );
        }
    }

    async fn on_close(&self) {
        self.dispatcher.disconnect(&self.connection).await;
    }
}
