//! Document snapshot entity and store trait.
//!
//! Every accepted collaboration update is recorded as a new version of the
//! document. The store is an external collaborator: the live broadcast path
//! never waits on it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::value_objects::Identity;
use crate::shared::error::AppError;

/// Descriptor of a change to persist.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotChange {
    pub changed_by: Identity,
    /// Short description, the update kind for live edits
    pub description: String,
    /// Last known full document state, if any
    pub content: Option<Value>,
}

/// One persisted version of a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotRecord {
    pub document_id: String,
    pub version_number: i32,
    pub changed_by: Identity,
    pub change_description: String,
    pub created_at: DateTime<Utc>,
}

/// Durable version history for collaborative documents.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Append a new version for `document_id`.
    async fn save_snapshot(
        &self,
        document_id: &str,
        change: &SnapshotChange,
    ) -> Result<SnapshotRecord, AppError>;

    /// All versions of `document_id`, oldest first.
    async fn list_versions(&self, document_id: &str) -> Result<Vec<SnapshotRecord>, AppError>;
}
