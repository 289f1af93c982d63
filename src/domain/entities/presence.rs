//! Voice presence mirror trait.
//!
//! The in-memory roster is authoritative. A mirror publishes membership to
//! an external store for cross-process visibility; it is write-through and
//! best effort.

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::value_objects::Identity;
use crate::shared::error::AppError;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PresenceMirror: Send + Sync {
    /// Record that `user_id` occupies `channel_id`.
    async fn joined(&self, channel_id: &str, user_id: &Identity) -> Result<(), AppError>;

    /// Record that `user_id` left `channel_id`.
    async fn left(&self, channel_id: &str, user_id: &Identity) -> Result<(), AppError>;

    /// Publish a voice event for other processes.
    async fn publish(&self, event: &str, payload: &Value) -> Result<(), AppError>;
}
