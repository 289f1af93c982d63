//! # Realtime Hub Library
//!
//! This crate provides the real-time core of the chat platform:
//! - WebSocket connection hub with broadcast and targeted delivery
//! - Signaling relay for calls and voice negotiation
//! - In-memory voice channel roster
//! - Live collaboration sessions for whiteboards and notebooks
//!
//! ## Architecture
//!
//! The crate follows Clean Architecture principles:
//!
//! - **Domain Layer**: Identities, roster and collaboration entities, collaborator traits
//! - **Application Layer**: Voice roster, collaboration manager, background task pool
//! - **Infrastructure Layer**: PostgreSQL snapshots, Redis presence mirror, metrics
//! - **Presentation Layer**: WebSocket hub, dispatcher, HTTP query endpoints
//!
//! ## Module Structure
//!
//! ```text
//! realtime_hub/
//! +-- config/         Configuration management
//! +-- domain/         Domain entities, value objects, and traits
//! +-- application/    Application services and DTOs
//! +-- infrastructure/ Database, cache and metrics implementations
//! +-- presentation/   HTTP routes and WebSocket handlers
//! +-- shared/         Common utilities (errors, delivery queues)
//! ```

// Configuration module
pub mod config;

// Domain layer - Core business logic
pub mod domain;

// Application layer - Business services
pub mod application;

// Infrastructure layer - External implementations
pub mod infrastructure;

// Presentation layer - HTTP and WebSocket handlers
pub mod presentation;

// Shared utilities
pub mod shared;

// Application startup and state management
pub mod startup;

// Telemetry and observability
pub mod telemetry;
