//! # Domain Layer
//!
//! The domain layer contains the core types of the real-time hub.
//! It is independent of any external frameworks or infrastructure concerns.
//!
//! ## Structure
//!
//! - **entities**: Roster and collaboration entities, collaborator traits
//! - **value_objects**: Immutable value types (Identity)
//!
//! ## Design Principles
//!
//! - No dependencies on infrastructure or presentation layers
//! - Collaborator traits define external contracts
//! - Wire types are decoded once at the boundary

pub mod entities;
pub mod value_objects;

// Re-export commonly used types
pub use entities::*;
pub use value_objects::*;
