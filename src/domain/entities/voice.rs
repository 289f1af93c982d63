//! Voice channel participant entity.

use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{null_as_default, Identity};

/// A user currently occupying a voice channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceParticipant {
    pub user_id: Identity,
    pub username: String,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "String::is_empty"
    )]
    pub avatar: String,
    pub is_muted: bool,
    pub is_deafened: bool,
}

impl VoiceParticipant {
    pub fn new(
        user_id: Identity,
        username: impl Into<String>,
        avatar: impl Into<String>,
        is_muted: bool,
        is_deafened: bool,
    ) -> Self {
        Self {
            user_id,
            username: username.into(),
            avatar: avatar.into(),
            is_muted,
            is_deafened,
        }
    }
}
