//! HTTP Layer
//!
//! Query endpoints over the hub's in-memory state, health probes and metrics.

pub mod handlers;
pub mod routes;
