//! Application Services
//!
//! In-memory registries and executors that the real-time hub coordinates.
//!
//! ## Available Services
//!
//! - **VoiceRoster**: Who occupies each voice channel, with mute/deafen flags
//! - **CollaborationManager**: Live co-editing sessions per document
//! - **TaskPool**: Bounded executor for background side effects

pub mod collaboration;
pub mod task_pool;
pub mod voice_roster;

pub use collaboration::{CollaborationManager, CollaborationSession, Subscription};
pub use task_pool::{TaskPool, TaskPoolStats};
pub use voice_roster::VoiceRoster;
