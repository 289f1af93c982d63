//! Inbound Event Dispatcher
//!
//! Routes each decoded frame to one of: a single target connection
//! (signaling relay), the voice roster followed by a broadcast, a
//! collaboration session, or a plain broadcast. Also owns the disconnect
//! cascade.

use std::sync::Arc;

use serde_json::{json, Value};

use super::connection::Connection;
use super::hub::HubHandle;
use super::messages::{DecodeError, InboundEnvelope, InboundEvent, FROM_FIELD};
use crate::application::{CollaborationManager, TaskPool, VoiceRoster};
use crate::domain::{Identity, PresenceMirror};
use crate::infrastructure::metrics;
use crate::shared::delivery::{Delivery, OutboundEvent};

/// Where an inbound event was sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Relayed to a single identity
    Direct(Identity),
    /// Signaling event without a usable target; discarded
    Unroutable,
    /// Applied to the voice roster and broadcast
    Voice,
    /// Answered on the sender's own queue
    Reply,
    /// Handled by a collaboration session
    Collaboration,
    /// Delivered to every connection
    Broadcast,
}

#[derive(Debug, Clone, Copy)]
enum Membership {
    Joined,
    Left,
    Unchanged,
}

pub struct Dispatcher {
    hub: HubHandle,
    voice: Arc<VoiceRoster>,
    collaboration: Arc<CollaborationManager>,
    presence: Option<Arc<dyn PresenceMirror>>,
    tasks: TaskPool,
}

impl Dispatcher {
    pub fn new(
        hub: HubHandle,
        voice: Arc<VoiceRoster>,
        collaboration: Arc<CollaborationManager>,
        presence: Option<Arc<dyn PresenceMirror>>,
        tasks: TaskPool,
    ) -> Self {
        Self {
            hub,
            voice,
            collaboration,
            presence,
            tasks,
        }
    }

    pub fn hub(&self) -> &HubHandle {
        &self.hub
    }

    /// Decode one text frame from `connection` and act on it.
    pub async fn dispatch(
        &self,
        connection: &Arc<Connection>,
        text: &str,
    ) -> Result<Route, DecodeError> {
        let envelope = InboundEnvelope::decode(text, connection.identity())?;
        metrics::record_inbound_event(envelope.event.kind_label());

        let tag = envelope.type_tag().to_string();
        let InboundEnvelope { event, raw } = envelope;
        let raw = Value::Object(raw);
        let from = connection.identity();

        let route = match event {
            InboundEvent::Signal(target) => match target.target() {
                Some(target) => {
                    tracing::debug!(kind = %tag, from = %from, to = %target, "Relaying signal");
                    self.send_to(target.clone(), raw).await;
                    Route::Direct(target.clone())
                }
                None => {
                    tracing::debug!(kind = %tag, from = %from, "Signal without target discarded");
                    Route::Unroutable
                }
            },
            InboundEvent::VoiceJoin(join) => {
                self.voice.join(
                    &join.channel_id,
                    from.clone(),
                    &join.username,
                    &join.avatar,
                    join.is_muted,
                    join.is_deafened,
                );
                tracing::info!(user_id = %from, channel_id = %join.channel_id, "Voice join");
                self.broadcast(raw.clone()).await;
                self.mirror_voice(&tag, join.channel_id, from, Membership::Joined, raw);
                Route::Voice
            }
            InboundEvent::VoiceLeave(leave) => {
                self.voice.leave(&leave.channel_id, from);
                tracing::info!(user_id = %from, channel_id = %leave.channel_id, "Voice leave");
                self.broadcast(raw.clone()).await;
                self.mirror_voice(&tag, leave.channel_id, from, Membership::Left, raw);
                Route::Voice
            }
            InboundEvent::VoiceStateUpdate(update) => {
                self.voice.update_state(
                    &update.channel_id,
                    from,
                    update.is_muted,
                    update.is_deafened,
                );
                tracing::debug!(user_id = %from, channel_id = %update.channel_id, "Voice state update");
                self.broadcast(raw.clone()).await;
                self.mirror_voice(&tag, update.channel_id, from, Membership::Unchanged, raw);
                Route::Voice
            }
            InboundEvent::Ping => {
                if connection.send(Arc::new(json!({"type": "pong"}))) == Delivery::Dropped {
                    metrics::record_dropped("reply", 1);
                }
                Route::Reply
            }
            InboundEvent::CollabJoin(join) => {
                let username = if join.username.is_empty() {
                    from.to_string()
                } else {
                    join.username
                };
                self.join_collaboration(connection, &join.document_id, &username);
                Route::Collaboration
            }
            InboundEvent::CollabLeave(leave) => {
                if let Some(session) = self.collaboration.get(&leave.document_id) {
                    self.collaboration.remove_participant(&session, from);
                }
                Route::Collaboration
            }
            InboundEvent::CollabUpdate(update) => {
                let session = self.collaboration.get_or_create(&update.document_id);
                self.collaboration
                    .broadcast_update(&session, from, update.update);
                Route::Collaboration
            }
            InboundEvent::CollabCursor(cursor) => {
                if let Some(session) = self.collaboration.get(&cursor.document_id) {
                    self.collaboration
                        .broadcast_cursor(&session, from, cursor.cursor);
                }
                Route::Collaboration
            }
            InboundEvent::CollabSyncState(sync) => {
                let session = self.collaboration.get_or_create(&sync.document_id);
                self.collaboration.sync_state(&session, from, sync.state);
                Route::Collaboration
            }
            InboundEvent::Other => {
                self.broadcast(raw).await;
                Route::Broadcast
            }
        };

        Ok(route)
    }

    /// Tear down a hub connection.
    ///
    /// Returns `true` when the connection was its identity's current one, in
    /// which case the identity is also removed from every voice channel and
    /// collaboration session.
    pub async fn disconnect(&self, connection: &Connection) -> bool {
        let current = match self.hub.unregister(connection).await {
            Ok(current) => current,
            Err(e) => {
                tracing::warn!(connection_id = %connection.id(), error = %e, "Unregister failed");
                false
            }
        };
        connection.close();

        if !current {
            return false;
        }

        let identity = connection.identity();
        for channel_id in self.voice.remove_identity(identity) {
            let leave = json!({
                "type": "voice-leave",
                "channel_id": channel_id,
                FROM_FIELD: identity,
            });
            self.broadcast(leave.clone()).await;
            self.mirror_voice("voice-leave", channel_id, identity, Membership::Left, leave);
        }

        let documents = self.collaboration.remove_identity(identity);
        if !documents.is_empty() {
            tracing::debug!(user_id = %identity, sessions = documents.len(), "Left collaboration sessions");
        }

        true
    }

    async fn broadcast(&self, event: Value) {
        if let Err(e) = self.hub.broadcast(Arc::new(event)).await {
            tracing::warn!(error = %e, "Broadcast failed");
        }
    }

    async fn send_to(&self, identity: Identity, event: Value) {
        if let Err(e) = self.hub.send_to_identity(identity, Arc::new(event)).await {
            tracing::warn!(error = %e, "Direct delivery failed");
        }
    }

    /// Subscribe a hub connection to a session and forward its events.
    fn join_collaboration(&self, connection: &Arc<Connection>, document_id: &str, username: &str) {
        let session = self.collaboration.get_or_create(document_id);
        let identity = connection.identity().clone();
        let mut subscription =
            self.collaboration
                .add_participant(&session, identity.clone(), username);

        let manager = self.collaboration.clone();
        let connection = connection.clone();
        tokio::spawn(async move {
            while let Some(event) = subscription.events.recv().await {
                match connection.send(event) {
                    Delivery::Closed => break,
                    Delivery::Dropped => metrics::record_dropped("collab_forward", 1),
                    Delivery::Delivered => {}
                }
            }
            manager.remove_participant_if(&session, &identity, subscription.participant_id);
        });
    }

    fn mirror_voice(
        &self,
        event: &str,
        channel_id: String,
        user_id: &Identity,
        membership: Membership,
        payload: Value,
    ) {
        let Some(presence) = self.presence.clone() else {
            return;
        };
        let event = event.to_string();
        let user_id = user_id.clone();

        self.tasks.submit("presence_mirror", async move {
            match membership {
                Membership::Joined => presence.joined(&channel_id, &user_id).await?,
                Membership::Left => presence.left(&channel_id, &user_id).await?,
                Membership::Unchanged => {}
            }
            presence.publish(&event, &payload).await?;
            Ok(())
        });
    }
}
