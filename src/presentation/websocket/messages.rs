//! WebSocket Message Types
//!
//! Inbound frames are JSON objects with a `type` tag and a free-form payload.
//! Each frame is decoded exactly once into [`InboundEvent`]; the raw object
//! is kept alongside so it can be forwarded verbatim.

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::domain::{
    flexible_id, null_as_default, optional_flexible_id, CursorPosition, Identity, Update,
};

/// Field stamped on every forwarded event with the sender's identity
pub const FROM_FIELD: &str = "fromUserId";

/// Payload fields the hub reads from a signaling event.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SignalTarget {
    #[serde(rename = "targetUserId", default, deserialize_with = "optional_flexible_id")]
    target_user_id: Option<Identity>,
    #[serde(rename = "targetIdentity", default, deserialize_with = "optional_flexible_id")]
    target_identity: Option<Identity>,
}

impl SignalTarget {
    /// The addressed identity, if the event names a usable one.
    pub fn target(&self) -> Option<&Identity> {
        self.target_user_id
            .as_ref()
            .filter(|id| id.is_addressable())
            .or_else(|| self.target_identity.as_ref().filter(|id| id.is_addressable()))
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VoiceJoin {
    #[serde(deserialize_with = "flexible_id")]
    pub channel_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub username: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub avatar: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_muted: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_deafened: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VoiceLeave {
    #[serde(deserialize_with = "flexible_id")]
    pub channel_id: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VoiceStateUpdate {
    #[serde(deserialize_with = "flexible_id")]
    pub channel_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_muted: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_deafened: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CollabJoin {
    #[serde(deserialize_with = "flexible_id")]
    pub document_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CollabLeave {
    #[serde(deserialize_with = "flexible_id")]
    pub document_id: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CollabUpdate {
    #[serde(deserialize_with = "flexible_id")]
    pub document_id: String,
    pub update: Update,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CollabCursor {
    #[serde(deserialize_with = "flexible_id")]
    pub document_id: String,
    pub cursor: CursorPosition,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CollabSyncState {
    #[serde(deserialize_with = "flexible_id")]
    pub document_id: String,
    pub state: Value,
}

/// Closed set of inbound events the hub acts on.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type")]
pub enum InboundEvent {
    /// Point-to-point call and voice negotiation
    #[serde(
        rename = "call-offer",
        alias = "call-answer",
        alias = "ice-candidate",
        alias = "call-end",
        alias = "call-rejected",
        alias = "call-accepted",
        alias = "call-cancelled",
        alias = "voice-offer",
        alias = "voice-answer",
        alias = "voice-ice-candidate"
    )]
    Signal(SignalTarget),
    #[serde(rename = "voice-join")]
    VoiceJoin(VoiceJoin),
    #[serde(rename = "voice-leave")]
    VoiceLeave(VoiceLeave),
    #[serde(rename = "voice-state-update")]
    VoiceStateUpdate(VoiceStateUpdate),
    #[serde(rename = "ping")]
    Ping,
    #[serde(rename = "collab-join")]
    CollabJoin(CollabJoin),
    #[serde(rename = "collab-leave")]
    CollabLeave(CollabLeave),
    #[serde(rename = "collab-update")]
    CollabUpdate(CollabUpdate),
    #[serde(rename = "collab-cursor")]
    CollabCursor(CollabCursor),
    #[serde(rename = "collab-sync-state")]
    CollabSyncState(CollabSyncState),
    /// Any other tag; broadcast unchanged
    #[serde(other)]
    Other,
}

impl InboundEvent {
    /// Bounded label for metrics.
    pub fn kind_label(&self) -> &'static str {
        match self {
            Self::Signal(_) => "signal",
            Self::VoiceJoin(_) => "voice-join",
            Self::VoiceLeave(_) => "voice-leave",
            Self::VoiceStateUpdate(_) => "voice-state-update",
            Self::Ping => "ping",
            Self::CollabJoin(_) => "collab-join",
            Self::CollabLeave(_) => "collab-leave",
            Self::CollabUpdate(_) => "collab-update",
            Self::CollabCursor(_) => "collab-cursor",
            Self::CollabSyncState(_) => "collab-sync-state",
            Self::Other => "other",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("frame is not valid JSON: {0}")]
    InvalidJson(serde_json::Error),
    #[error("frame is not a JSON object")]
    NotAnObject,
    #[error("invalid event payload: {0}")]
    InvalidPayload(serde_json::Error),
}

/// A decoded inbound frame.
#[derive(Debug, Clone)]
pub struct InboundEnvelope {
    pub event: InboundEvent,
    /// The original object, stamped with the sender identity
    pub raw: Map<String, Value>,
}

impl InboundEnvelope {
    pub fn decode(text: &str, from: &Identity) -> Result<Self, DecodeError> {
        let value: Value = serde_json::from_str(text).map_err(DecodeError::InvalidJson)?;
        if !value.is_object() {
            return Err(DecodeError::NotAnObject);
        }

        let event = InboundEvent::deserialize(&value).map_err(DecodeError::InvalidPayload)?;

        let Value::Object(mut raw) = value else {
            return Err(DecodeError::NotAnObject);
        };
        raw.insert(FROM_FIELD.to_string(), Value::String(from.to_string()));

        Ok(Self { event, raw })
    }

    /// The event type tag as sent by the client.
    pub fn type_tag(&self) -> &str {
        self.raw.get("type").and_then(Value::as_str).unwrap_or_default()
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.raw)
    }
}
