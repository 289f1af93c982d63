//! Cache Module
//!
//! Redis connection management and the voice presence mirror.
//!
//! The in-memory voice roster is authoritative. Redis only receives a
//! best-effort copy so that other processes can observe channel membership
//! and subscribe to voice events.
//!
//! # Example
//!
//! ```rust,ignore
//! use realtime_hub::infrastructure::cache::{create_redis_client, RedisPresenceMirror};
//!
//! let conn = create_redis_client("redis://localhost:6379").await?;
//! let mirror = RedisPresenceMirror::new(conn);
//! mirror.joined("v1", &Identity::new("42")).await?;
//! ```

mod presence_cache;

pub use presence_cache::RedisPresenceMirror;

use redis::aio::ConnectionManager;
use redis::Client;
use tracing::{info, instrument};

/// Creates a Redis connection manager with automatic reconnection.
///
/// # Returns
/// * `Ok(ConnectionManager)` - On successful connection
/// * `Err(redis::RedisError)` - If connection fails
#[instrument(skip(url))]
pub async fn create_redis_client(url: &str) -> Result<ConnectionManager, redis::RedisError> {
    info!("Connecting to Redis...");
    let client = Client::open(url)?;
    let manager = ConnectionManager::new(client).await?;
    info!("Redis connection established");
    Ok(manager)
}

/// Cache key naming for voice presence.
pub mod keys {
    /// Prefix for voice channel member sets (e.g., "voice:channel:channel_id")
    pub const VOICE_CHANNEL: &str = "voice:channel:";

    /// Prefix for a user's current voice channel (e.g., "voice:user:user_id")
    pub const VOICE_USER: &str = "voice:user:";

    /// Prefix for voice event pub/sub channels (e.g., "voice:events:voice-join")
    pub const VOICE_EVENTS: &str = "voice:events:";

    #[inline]
    pub fn voice_channel(channel_id: impl std::fmt::Display) -> String {
        format!("{}{}", VOICE_CHANNEL, channel_id)
    }

    #[inline]
    pub fn voice_user(user_id: impl std::fmt::Display) -> String {
        format!("{}{}", VOICE_USER, user_id)
    }

    #[inline]
    pub fn voice_events(event: &str) -> String {
        format!("{}{}", VOICE_EVENTS, event)
    }
}
