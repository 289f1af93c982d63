//! Application settings and configuration structures.

use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// Root configuration structure containing all application settings.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Server configuration (host, port)
    pub server: ServerSettings,

    /// Snapshot database configuration (PostgreSQL, optional)
    pub database: DatabaseSettings,

    /// Presence mirror configuration (Redis, optional)
    pub redis: RedisSettings,

    /// JWT validation settings
    pub jwt: JwtSettings,

    /// CORS configuration
    pub cors: CorsSettings,

    /// WebSocket transport and liveness configuration
    pub websocket: WebSocketSettings,

    /// Hub coordinator configuration
    pub hub: HubSettings,

    /// Collaboration session configuration
    pub collaboration: CollaborationSettings,

    /// Background task pool configuration
    pub tasks: TaskSettings,

    /// Current environment (development, staging, production)
    pub environment: String,
}

/// Server binding configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    /// Host address to bind to (e.g., "0.0.0.0")
    pub host: String,

    /// Port number to listen on
    pub port: u16,
}

/// PostgreSQL configuration for the snapshot store.
///
/// When `url` is absent snapshots are kept in memory.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    /// Database connection URL
    #[serde(default)]
    pub url: Option<String>,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections to maintain
    pub min_connections: u32,

    /// Connection acquire timeout in seconds
    pub acquire_timeout: u64,

    /// Apply embedded migrations on startup
    pub run_migrations: bool,
}

/// Redis configuration for the voice presence mirror.
#[derive(Debug, Clone, Deserialize)]
pub struct RedisSettings {
    /// Redis connection URL; mirroring is disabled when absent
    #[serde(default)]
    pub url: Option<String>,
}

/// JWT validation configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct JwtSettings {
    /// Shared HMAC secret used by the authentication service
    pub secret: String,
}

/// CORS configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CorsSettings {
    /// Allowed origins (comma-separated in env)
    pub allowed_origins: Vec<String>,
}

/// WebSocket configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct WebSocketSettings {
    /// Maximum inbound message size in bytes (default: 512KB)
    pub max_message_size: usize,

    /// Maximum inbound frame size in bytes (default: 512KB)
    pub max_frame_size: usize,

    /// Capacity of each connection's outbound queue (default: 256)
    pub outbound_queue_capacity: usize,

    /// Read deadline; reset by every inbound frame (default: 60s)
    pub pong_wait_secs: u64,

    /// Deadline for a single outbound write (default: 10s)
    pub write_wait_secs: u64,
}

/// Hub coordinator configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct HubSettings {
    /// Capacity of the coordinator's command channel
    pub command_buffer: usize,
}

/// Collaboration session configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CollaborationSettings {
    /// Capacity of each participant's outbound queue (default: 100)
    pub participant_queue_capacity: usize,

    /// Empty sessions idle for longer than this are pruned (default: 300s)
    pub idle_session_ttl_secs: u64,

    /// How often the pruner runs (default: 60s)
    pub prune_interval_secs: u64,
}

/// Background task pool configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskSettings {
    /// Maximum number of side-effect jobs running at once
    pub max_concurrency: usize,

    /// Maximum number of queued jobs before submissions are rejected
    pub queue_capacity: usize,
}

/// Minimum required length for JWT secret (256 bits = 32 bytes)
pub const MIN_JWT_SECRET_LENGTH: usize = 32;

impl Settings {
    /// Load settings from environment variables and configuration files.
    ///
    /// The loading order is:
    /// 1. config/default.toml (base configuration)
    /// 2. config/{RUN_ENV}.toml (environment-specific overrides)
    /// 3. Environment variables (highest priority)
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if configuration cannot be loaded or parsed,
    /// or if JWT secret is too short.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        // Determine the running environment
        let environment = std::env::var("RUN_ENV").unwrap_or_else(|_| "development".into());

        Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 1)?
            .set_default("database.acquire_timeout", 30)?
            .set_default("database.run_migrations", true)?
            .set_default("cors.allowed_origins", vec!["http://localhost:3000"])?
            // WebSocket settings - security limits to prevent DoS
            .set_default("websocket.max_message_size", 524288_i64)? // 512KB
            .set_default("websocket.max_frame_size", 524288_i64)?
            .set_default("websocket.outbound_queue_capacity", 256_i64)?
            .set_default("websocket.pong_wait_secs", 60_i64)?
            .set_default("websocket.write_wait_secs", 10_i64)?
            .set_default("hub.command_buffer", 256_i64)?
            .set_default("collaboration.participant_queue_capacity", 100_i64)?
            .set_default("collaboration.idle_session_ttl_secs", 300_i64)?
            .set_default("collaboration.prune_interval_secs", 60_i64)?
            .set_default("tasks.max_concurrency", 8_i64)?
            .set_default("tasks.queue_capacity", 1024_i64)?
            // Load from config files
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Load from environment variables
            // APP__SERVER__PORT=8080 -> server.port = 8080
            .add_source(
                Environment::default()
                    .prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            // Map simple environment variables
            .set_override_option("server.host", std::env::var("SERVER_HOST").ok())?
            .set_override_option("server.port", std::env::var("SERVER_PORT").ok())?
            .set_override_option("database.url", std::env::var("DATABASE_URL").ok())?
            .set_override_option("redis.url", std::env::var("REDIS_URL").ok())?
            .set_override_option("jwt.secret", std::env::var("JWT_SECRET").ok())?
            .build()?
            .try_deserialize()
            .and_then(|settings: Self| {
                settings.validate()?;
                Ok(settings)
            })
    }

    /// Reject configurations the hub cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt.secret.len() < MIN_JWT_SECRET_LENGTH {
            return Err(ConfigError::Message(format!(
                "JWT secret must be at least {} characters for security. Current length: {}",
                MIN_JWT_SECRET_LENGTH,
                self.jwt.secret.len()
            )));
        }
        if self.websocket.pong_wait_secs < 2 {
            return Err(ConfigError::Message(
                "websocket.pong_wait_secs must be at least 2 seconds".into(),
            ));
        }
        Ok(())
    }

    /// Get the full server address as a string.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl Default for Settings {
    /// Development defaults; mirrors the values applied by [`Settings::load`].
    fn default() -> Self {
        Self {
            server: ServerSettings {
                host: "127.0.0.1".into(),
                port: 8080,
            },
            database: DatabaseSettings {
                url: None,
                max_connections: 10,
                min_connections: 1,
                acquire_timeout: 30,
                run_migrations: true,
            },
            redis: RedisSettings { url: None },
            jwt: JwtSettings {
                secret: "development-only-secret-please-override".into(),
            },
            cors: CorsSettings {
                allowed_origins: vec!["http://localhost:3000".into()],
            },
            websocket: WebSocketSettings {
                max_message_size: 512 * 1024,
                max_frame_size: 512 * 1024,
                outbound_queue_capacity: 256,
                pong_wait_secs: 60,
                write_wait_secs: 10,
            },
            hub: HubSettings {
                command_buffer: 256,
            },
            collaboration: CollaborationSettings {
                participant_queue_capacity: 100,
                idle_session_ttl_secs: 300,
                prune_interval_secs: 60,
            },
            tasks: TaskSettings {
                max_concurrency: 8,
                queue_capacity: 1024,
            },
            environment: "development".into(),
        }
    }
}

impl WebSocketSettings {
    /// Read deadline for a silent peer.
    pub fn pong_wait(&self) -> Duration {
        Duration::from_secs(self.pong_wait_secs)
    }

    /// Probe period; always shorter than the read deadline.
    pub fn ping_period(&self) -> Duration {
        self.pong_wait() * 9 / 10
    }

    /// Deadline for a single outbound write.
    pub fn write_wait(&self) -> Duration {
        Duration::from_secs(self.write_wait_secs)
    }
}

impl CollaborationSettings {
    pub fn idle_session_ttl(&self) -> Duration {
        Duration::from_secs(self.idle_session_ttl_secs)
    }

    pub fn prune_interval(&self) -> Duration {
        Duration::from_secs(self.prune_interval_secs.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_ping_period_shorter_than_pong_wait() {
        let settings = Settings::default();
        assert!(settings.websocket.ping_period() < settings.websocket.pong_wait());
        assert_eq!(settings.websocket.ping_period(), Duration::from_secs(54));
    }

    #[test]
    fn test_short_jwt_secret_rejected() {
        let mut settings = Settings::default();
        settings.jwt.secret = "short".into();
        assert!(settings.validate().is_err());
    }
}
