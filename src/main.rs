//! # Realtime Hub
//!
//! Real-time connection hub for the chat platform.
//!
//! This is the application entry point that initializes:
//! - Tracing/logging subsystem
//! - Configuration loading
//! - Optional PostgreSQL snapshot store and Redis presence mirror
//! - Hub coordinator, background task pool and session pruner
//! - HTTP/WebSocket server

use anyhow::Result;
use tracing::info;

use realtime_hub::config::Settings;
use realtime_hub::startup::Application;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber for structured logging
    realtime_hub::telemetry::init_tracing();

    info!("Starting Realtime Hub...");

    // Load configuration from environment and config files
    let settings = Settings::load()?;
    info!(
        host = %settings.server.host,
        port = %settings.server.port,
        environment = %settings.environment,
        "Configuration loaded"
    );

    // Build and run the application
    let application = Application::build(settings).await?;

    info!("Server ready to accept connections");
    application.run_until_stopped().await?;

    Ok(())
}
