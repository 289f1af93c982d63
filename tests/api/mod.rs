//! HTTP API Tests

mod collaboration_tests;
mod health_tests;
mod socket_tests;
mod voice_tests;
mod websocket_tests;
