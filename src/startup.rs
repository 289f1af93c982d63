//! Application Startup
//!
//! Application building and server initialization.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use redis::aio::ConnectionManager;
use sqlx::PgPool;
use tokio::net::TcpListener;

use crate::application::{CollaborationManager, TaskPool, VoiceRoster};
use crate::config::Settings;
use crate::domain::{PresenceMirror, SnapshotStore};
use crate::infrastructure::cache::{self, RedisPresenceMirror};
use crate::infrastructure::database;
use crate::infrastructure::repositories::{InMemorySnapshotStore, PgSnapshotRepository};
use crate::presentation::http::handlers::health::init_server_start;
use crate::presentation::http::routes;
use crate::presentation::middleware::{cors, logging};
use crate::presentation::websocket::{Dispatcher, HubHandle};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub hub: HubHandle,
    pub voice: Arc<VoiceRoster>,
    pub collaboration: Arc<CollaborationManager>,
    pub dispatcher: Arc<Dispatcher>,
    pub snapshots: Arc<dyn SnapshotStore>,
    pub tasks: TaskPool,
    pub db: Option<PgPool>,
    pub redis: Option<ConnectionManager>,
}

impl AppState {
    /// Wire the registries together. Must be called inside a Tokio runtime.
    ///
    /// Snapshots go to PostgreSQL when `db` is present and stay in memory
    /// otherwise; voice presence is mirrored only when `redis` is present.
    pub fn new(settings: Settings, db: Option<PgPool>, redis: Option<ConnectionManager>) -> Self {
        let (hub, _coordinator) = HubHandle::spawn(settings.hub.command_buffer);
        let tasks = TaskPool::new(settings.tasks.max_concurrency, settings.tasks.queue_capacity);

        let snapshots: Arc<dyn SnapshotStore> = match &db {
            Some(pool) => Arc::new(PgSnapshotRepository::new(pool.clone())),
            None => Arc::new(InMemorySnapshotStore::new()),
        };
        let presence = redis
            .clone()
            .map(|conn| Arc::new(RedisPresenceMirror::new(conn)) as Arc<dyn PresenceMirror>);

        let voice = Arc::new(VoiceRoster::new());
        let collaboration = Arc::new(CollaborationManager::new(
            settings.collaboration.participant_queue_capacity,
            snapshots.clone(),
            tasks.clone(),
        ));
        let dispatcher = Arc::new(Dispatcher::new(
            hub.clone(),
            voice.clone(),
            collaboration.clone(),
            presence,
            tasks.clone(),
        ));

        Self {
            settings: Arc::new(settings),
            hub,
            voice,
            collaboration,
            dispatcher,
            snapshots,
            tasks,
            db,
            redis,
        }
    }
}

/// Application instance
pub struct Application {
    listener: TcpListener,
    router: Router,
}

impl Application {
    /// Build the application from settings
    pub async fn build(settings: Settings) -> Result<Self> {
        let db = connect_database(&settings).await;
        let redis = connect_redis(&settings).await;

        let state = AppState::new(settings.clone(), db, redis);

        // Empty collaboration sessions are dropped after the idle TTL
        state.collaboration.spawn_pruner(
            settings.collaboration.prune_interval(),
            settings.collaboration.idle_session_ttl(),
        );

        // Build router with middleware
        let router = routes::create_router(state)
            .layer(logging::create_trace_layer())
            .layer(cors::create_cors_layer(&settings.cors));

        // Bind to address
        let listener = TcpListener::bind(settings.server_addr()).await?;
        tracing::info!("Listening on {}", listener.local_addr()?);

        init_server_start();

        Ok(Self { listener, router })
    }

    /// Run the server until stopped
    pub async fn run_until_stopped(self) -> Result<()> {
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }

    /// Get the bound address
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}

/// The snapshot store falls back to memory when PostgreSQL is absent or down.
async fn connect_database(settings: &Settings) -> Option<PgPool> {
    let url = settings.database.url.as_deref()?;

    let pool = match database::create_pool(&settings.database, url).await {
        Ok(pool) => pool,
        Err(e) => {
            tracing::warn!(error = %e, "Database unavailable, keeping snapshots in memory");
            return None;
        }
    };
    tracing::info!("Database connection pool created");

    if settings.database.run_migrations {
        if let Err(e) = database::run_migrations(&pool).await {
            tracing::warn!(error = %e, "Migrations failed, keeping snapshots in memory");
            return None;
        }
        tracing::info!("Database migrations applied");
    }

    Some(pool)
}

/// Presence mirroring is skipped when Redis is absent or down.
async fn connect_redis(settings: &Settings) -> Option<ConnectionManager> {
    let url = settings.redis.url.as_deref()?;

    match cache::create_redis_client(url).await {
        Ok(conn) => Some(conn),
        Err(e) => {
            tracing::warn!(error = %e, "Redis unavailable, voice presence will not be mirrored");
            None
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
