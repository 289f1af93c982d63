//! Application Layer
//!
//! Contains the hub's stateful services and data transfer objects (DTOs).
//! This layer sits between the presentation transports and the domain
//! types.

pub mod services;
pub mod dto;

pub use services::{
    CollaborationManager, CollaborationSession, Subscription, TaskPool, TaskPoolStats,
    VoiceRoster,
};
