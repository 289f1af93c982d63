//! Collaboration WebSocket Handler
//!
//! Dedicated socket for one document. The participant's session queue is
//! the socket's outbound queue; inbound frames are `SyncMessage`s.

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::{
        ws::{rejection::WebSocketUpgradeRejection, WebSocket},
        Path, Query, State, WebSocketUpgrade,
    },
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use super::handler::authenticate;
use super::session::{self, FrameHandler, Liveness};
use crate::application::{CollaborationManager, CollaborationSession};
use crate::domain::{Identity, SyncKind, SyncMessage};
use crate::infrastructure::metrics;
use crate::startup::AppState;

#[derive(Debug, Deserialize)]
pub struct CollabQuery {
    pub token: Option<String>,
    #[serde(default)]
    pub username: String,
}

/// `GET /ws/collab/{document_id}`
pub async fn collab_ws_handler(
    State(state): State<AppState>,
    Path(document_id): Path<String>,
    Query(query): Query<CollabQuery>,
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

    let username = if query.username.is_empty() {
        identity.to_string()
    } else {
        query.username
    };

    let settings = &state.settings.websocket;
    ws.max_message_size(settings.max_message_size)
        .max_frame_size(settings.max_frame_size)
        .on_upgrade(move |socket| handle_socket(socket, state, document_id, identity, username))
}

async fn handle_socket(
    socket: WebSocket,
    state: AppState,
    document_id: String,
    identity: Identity,
    username: String,
) {
    let manager = state.collaboration.clone();
    let document = manager.get_or_create(&document_id);
    let subscription = manager.add_participant(&document, identity.clone(), &username);

    tracing::info!(
        document_id = %document_id,
        user_id = %identity,
        "Collaboration socket connected"
    );

    let handler = CollabFrameHandler {
        manager,
        session: document,
        identity,
        participant_id: subscription.participant_id,
    };
    let reason = session::run(
        socket,
        subscription.events,
        Liveness::from(&state.settings.websocket),
        &handler,
    )
    .await;

    tracing::info!(
        document_id = %document_id,
        user_id = %handler.identity,
        reason = ?reason,
        "Collaboration socket disconnected"
    );
}

struct CollabFrameHandler {
    manager: Arc<CollaborationManager>,
    session: Arc<CollaborationSession>,
    identity: Identity,
    participant_id: u64,
}

#[async_trait]
impl FrameHandler for CollabFrameHandler {
    async fn on_text(&self, text: &str) {
        let message: SyncMessage = match serde_json::from_str(text) {
            Ok(message) => message,
            Err(e) => {
                metrics::record_malformed_event();
                tracing::debug!(user_id = %self.identity, error = %e, "Discarded malformed sync message");
                return;
            }
        };
        metrics::record_inbound_event("collab-socket");

        match message.kind {
            SyncKind::Update => {
                if let Some(update) = message.update {
                    self.manager
                        .broadcast_update(&self.session, &self.identity, update);
                }
            }
            SyncKind::Cursor => {
                if let Some(cursor) = message.cursor {
                    self.manager
                        .broadcast_cursor(&self.session, &self.identity, cursor);
                }
            }
            SyncKind::SyncState => {
                if let Some(state) = message.state {
                    self.manager.sync_state(&self.session, &self.identity, state);
                }
            }
        }
    }

    async fn on_close(&self) {
        self.manager
            .remove_participant_if(&self.session, &self.identity, self.participant_id);
    }
}
