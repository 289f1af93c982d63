//! Response DTOs
//!
//! Data structures for API response bodies.

use serde::Serialize;

use crate::domain::{ParticipantInfo, SnapshotRecord, VoiceParticipant};
use crate::shared::delivery::FanOut;

/// Voice channel roster response
#[derive(Debug, Serialize)]
pub struct VoiceParticipantsResponse {
    pub channel_id: String,
    pub participants: Vec<VoiceParticipant>,
    pub count: usize,
}

impl VoiceParticipantsResponse {
    pub fn new(channel_id: String, participants: Vec<VoiceParticipant>) -> Self {
        Self {
            channel_id,
            count: participants.len(),
            participants,
        }
    }
}

/// Collaboration session participants response
#[derive(Debug, Serialize)]
pub struct CollabParticipantsResponse {
    pub document_id: String,
    pub users: Vec<ParticipantInfo>,
    pub count: usize,
}

impl CollabParticipantsResponse {
    pub fn new(document_id: String, users: Vec<ParticipantInfo>) -> Self {
        Self {
            document_id,
            count: users.len(),
            users,
        }
    }
}

/// Result of a fan-out triggered over REST
#[derive(Debug, Serialize)]
pub struct DeliveryResponse {
    pub status: &'static str,
    pub delivered: usize,
    pub dropped: usize,
}

impl From<FanOut> for DeliveryResponse {
    fn from(tally: FanOut) -> Self {
        Self {
            status: "ok",
            delivered: tally.delivered,
            dropped: tally.dropped,
        }
    }
}

/// Document version entry
#[derive(Debug, Serialize)]
pub struct VersionResponse {
    pub version_number: i32,
    pub changed_by: String,
    pub change_description: String,
    pub created_at: String,
}

impl From<SnapshotRecord> for VersionResponse {
    fn from(record: SnapshotRecord) -> Self {
        Self {
            version_number: record.version_number,
            changed_by: record.changed_by.to_string(),
            change_description: record.change_description,
            created_at: record.created_at.to_rfc3339(),
        }
    }
}

/// Document version history response
#[derive(Debug, Serialize)]
pub struct VersionListResponse {
    pub document_id: String,
    pub versions: Vec<VersionResponse>,
}
