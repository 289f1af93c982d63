//! Infrastructure Layer
//!
//! Contains implementations for external services including:
//! - Snapshot persistence (PostgreSQL, in-memory fallback)
//! - Voice presence mirroring (Redis)
//! - Prometheus metrics

pub mod database;
pub mod cache;
pub mod metrics;
pub mod repositories;
