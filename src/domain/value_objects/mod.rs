//! # Value Objects
//!
//! Immutable value types used across the domain.

mod identity;

pub use identity::{flexible_id, null_as_default, optional_flexible_id, Identity};
