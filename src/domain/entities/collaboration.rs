//! Collaboration entities.
//!
//! Wire types exchanged inside a live co-editing session of a whiteboard or
//! notebook. The document itself is opaque to the hub: element payloads and
//! full states travel as raw JSON.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::value_objects::{null_as_default, Identity};

/// Kind of change carried by an [`Update`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateKind {
    ElementAdded,
    ElementUpdated,
    ElementRemoved,
}

impl UpdateKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ElementAdded => "element_added",
            Self::ElementUpdated => "element_updated",
            Self::ElementRemoved => "element_removed",
        }
    }
}

/// A single change to a shared document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Update {
    #[serde(rename = "type")]
    pub kind: UpdateKind,
    #[serde(default, deserialize_with = "null_as_default")]
    pub user_id: Identity,
    #[serde(default, deserialize_with = "null_as_default")]
    pub username: String,
    pub element_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub data: Value,
    /// Unix milliseconds; stamped by the hub when the client leaves it at zero
    #[serde(default, deserialize_with = "null_as_default")]
    pub timestamp: i64,
}

/// A participant's pointer position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CursorPosition {
    #[serde(default, deserialize_with = "null_as_default")]
    pub user_id: Identity,
    #[serde(default, deserialize_with = "null_as_default")]
    pub username: String,
    pub x: f64,
    pub y: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub color: String,
}

/// Kind of a [`SyncMessage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncKind {
    Update,
    Cursor,
    SyncState,
}

/// Envelope exchanged with session participants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncMessage {
    #[serde(rename = "type")]
    pub kind: SyncKind,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tool_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update: Option<Update>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<CursorPosition>,
}

impl SyncMessage {
    pub fn update(document_id: &str, update: Update) -> Self {
        Self {
            kind: SyncKind::Update,
            tool_id: document_id.to_string(),
            update: Some(update),
            state: None,
            cursor: None,
        }
    }

    pub fn cursor(document_id: &str, cursor: CursorPosition) -> Self {
        Self {
            kind: SyncKind::Cursor,
            tool_id: document_id.to_string(),
            update: None,
            state: None,
            cursor: Some(cursor),
        }
    }

    pub fn state(document_id: &str, state: Value) -> Self {
        Self {
            kind: SyncKind::SyncState,
            tool_id: document_id.to_string(),
            update: None,
            state: Some(state),
            cursor: None,
        }
    }
}

/// Presence snapshot of one session participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantInfo {
    pub user_id: Identity,
    pub username: String,
    /// Unix seconds
    pub last_seen: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_update_wire_format() {
        let update: Update = serde_json::from_value(json!({
            "type": "element_added",
            "user_id": 5,
            "element_id": "rect-1",
            "data": {"w": 10}
        }))
        .unwrap();

        assert_eq!(update.kind, UpdateKind::ElementAdded);
        assert_eq!(update.user_id, Identity::new("5"));
        assert_eq!(update.timestamp, 0);

        let message = serde_json::to_value(SyncMessage::update("9", update)).unwrap();
        assert_eq!(message["type"], "update");
        assert_eq!(message["tool_id"], "9");
        assert_eq!(message["update"]["type"], "element_added");
        assert!(message.get("cursor").is_none());
    }

    #[test]
    fn test_state_message_kind() {
        let message = serde_json::to_value(SyncMessage::state("1", json!({"elements": []}))).unwrap();
        assert_eq!(message["type"], "sync_state");
    }
}
