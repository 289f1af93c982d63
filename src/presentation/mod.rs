//! Presentation Layer
//!
//! HTTP query endpoints, middleware and the WebSocket hub.

pub mod http;
pub mod websocket;
pub mod middleware;
