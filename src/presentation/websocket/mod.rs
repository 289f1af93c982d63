//! WebSocket Hub
//!
//! Real-time communication via WebSocket connections.

pub mod collab_handler;
pub mod connection;
pub mod dispatcher;
pub mod handler;
pub mod hub;
pub mod messages;
pub mod session;

pub use collab_handler::collab_ws_handler;
pub use connection::Connection;
pub use dispatcher::{Dispatcher, Route};
pub use handler::ws_handler;
pub use hub::{HubError, HubHandle, HubStats};
pub use messages::{DecodeError, InboundEnvelope, InboundEvent};
