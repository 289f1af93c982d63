//! Repository Implementations
//!
//! Implementations of the persistence traits defined in the domain layer.
//!
//! ## Available Repositories
//!
//! - **PgSnapshotRepository** - Document version history in the `tool_versions` table
//! - **InMemorySnapshotStore** - Process-local fallback when no database is configured

pub mod snapshot_repository;

pub use snapshot_repository::{InMemorySnapshotStore, PgSnapshotRepository};
