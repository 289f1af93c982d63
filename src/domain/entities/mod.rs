//! # Domain Entities
//!
//! Core domain entities of the real-time hub.
//!
//! ## Entities
//!
//! - **VoiceParticipant**: A user occupying a voice channel, with mute/deafen flags
//! - **Update / CursorPosition / SyncMessage**: Live collaboration wire types
//! - **SnapshotRecord**: A persisted version of a collaborative document
//!
//! ## Collaborator Traits
//!
//! - **SnapshotStore**: Durable version history, implemented in the infrastructure layer
//! - **PresenceMirror**: Cross-process voice presence, implemented over Redis

mod collaboration;
mod presence;
mod snapshot;
mod voice;

pub use collaboration::{
    CursorPosition, ParticipantInfo, SyncKind, SyncMessage, Update, UpdateKind,
};
pub use presence::PresenceMirror;
pub use snapshot::{SnapshotChange, SnapshotRecord, SnapshotStore};
pub use voice::VoiceParticipant;

#[cfg(test)]
pub use presence::MockPresenceMirror;
#[cfg(test)]
pub use snapshot::MockSnapshotStore;
