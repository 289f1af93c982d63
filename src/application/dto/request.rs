//! Request DTOs
//!
//! Data structures for API request bodies.

use serde::Deserialize;
use validator::Validate;

use crate::domain::{flexible_id, null_as_default, Update};

/// Collaboration update submitted over REST
#[derive(Debug, Deserialize, Validate)]
pub struct CollabSyncRequest {
    #[serde(alias = "tool_id", deserialize_with = "flexible_id")]
    #[validate(length(min = 1, max = 128, message = "Document id must be 1-128 characters"))]
    pub document_id: String,

    pub update: Update,
}

/// Cursor position submitted over REST
#[derive(Debug, Deserialize, Validate)]
pub struct CursorUpdateRequest {
    pub x: f64,
    pub y: f64,

    #[serde(default, deserialize_with = "null_as_default")]
    #[validate(length(max = 32, message = "Color must be at most 32 characters"))]
    pub color: String,

    #[serde(default, deserialize_with = "null_as_default")]
    #[validate(length(max = 64, message = "Username must be at most 64 characters"))]
    pub username: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_document_id_rejected() {
        let request: CollabSyncRequest = serde_json::from_value(json!({
            "document_id": "",
            "update": {"type": "element_added", "element_id": "r1"}
        }))
        .unwrap();

        assert!(request.validate().is_err());
    }

    #[test]
    fn test_numeric_tool_id_accepted() {
        let request: CollabSyncRequest = serde_json::from_value(json!({
            "tool_id": 12,
            "update": {"type": "element_removed", "element_id": "r1"}
        }))
        .unwrap();

        assert!(request.validate().is_ok());
        assert_eq!(request.document_id, "12");
    }

    #[test]
    fn test_cursor_defaults() {
        let request: CursorUpdateRequest =
            serde_json::from_value(json!({"x": 1.5, "y": 2})).unwrap();

        assert!(request.validate().is_ok());
        assert_eq!(request.color, "");
        assert_eq!(request.y, 2.0);
    }
}
