//! Shared Utilities
//!
//! Common utilities used across all layers.

pub mod delivery;
pub mod error;
