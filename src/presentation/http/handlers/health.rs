//! Health Check Handlers
//!
//! Provides health check endpoints for Kubernetes-style liveness and readiness probes.
//!
//! # Endpoints
//! - `GET /health` - Basic health check
//! - `GET /health/live` - Liveness probe (is the server running?)
//! - `GET /health/ready` - Readiness probe (can the server accept traffic?)

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use serde::Serialize;
use std::time::Instant;

use crate::application::TaskPoolStats;
use crate::presentation::websocket::HubStats;
use crate::startup::AppState;

/// Server start time for uptime calculation
static SERVER_START: Lazy<Instant> = Lazy::new(Instant::now);
static SERVER_START_TIME: Lazy<DateTime<Utc>> = Lazy::new(Utc::now);

/// Initialize the server start time (call during startup)
pub fn init_server_start() {
    Lazy::force(&SERVER_START);
    Lazy::force(&SERVER_START_TIME);
}

/// Basic health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// Detailed health check response
#[derive(Debug, Serialize)]
pub struct DetailedHealthResponse {
    pub status: HealthStatus,
    pub version: &'static str,
    pub uptime_seconds: u64,
    pub started_at: String,
    pub checks: HealthChecks,
}

/// Individual service health checks
#[derive(Debug, Serialize)]
pub struct HealthChecks {
    pub database: ServiceHealth,
    pub redis: ServiceHealth,
    pub hub: HubHealth,
    pub tasks: TaskPoolStats,
}

/// Health status for individual services
#[derive(Debug, Serialize)]
pub struct ServiceHealth {
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ServiceHealth {
    fn not_configured() -> Self {
        Self {
            status: HealthStatus::Healthy,
            latency_ms: None,
            message: Some("not configured".into()),
        }
    }
}

/// Real-time hub health
#[derive(Debug, Serialize)]
pub struct HubHealth {
    pub status: HealthStatus,
    pub active_connections: usize,
    pub identities: usize,
    pub dropped_deliveries: u64,
    pub voice_channels: usize,
    pub collaboration_sessions: usize,
}

/// Overall health status
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

/// Simple liveness response
#[derive(Debug, Serialize)]
pub struct LivenessResponse {
    pub status: &'static str,
}

/// Basic health check endpoint
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Liveness probe - checks if the server is running
pub async fn liveness() -> Json<LivenessResponse> {
    Json(LivenessResponse { status: "alive" })
}

/// Readiness probe - checks if the server can accept traffic
/// Returns 200 if ready, 503 if the hub or a configured dependency is down
pub async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    let uptime = SERVER_START.elapsed().as_secs();
    let started_at = SERVER_START_TIME.to_rfc3339();

    let db_health = check_database(&state).await;
    let redis_health = check_redis(&state).await;
    let hub_health = check_hub(&state).await;

    let overall_status = determine_overall_status(&db_health, &redis_health, hub_health.status);

    let response = DetailedHealthResponse {
        status: overall_status,
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: uptime,
        started_at,
        checks: HealthChecks {
            database: db_health,
            redis: redis_health,
            hub: hub_health,
            tasks: state.tasks.stats(),
        },
    };

    let status_code = match overall_status {
        HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(response))
}

/// Check database connectivity and latency
async fn check_database(state: &AppState) -> ServiceHealth {
    let Some(db) = &state.db else {
        return ServiceHealth::not_configured();
    };

    let start = Instant::now();
    match sqlx::query("SELECT 1").execute(db).await {
        Ok(_) => {
            let latency = start.elapsed().as_millis() as u64;
            ServiceHealth {
                status: if latency < 100 {
                    HealthStatus::Healthy
                } else {
                    HealthStatus::Degraded
                },
                latency_ms: Some(latency),
                message: None,
            }
        }
        Err(e) => ServiceHealth {
            status: HealthStatus::Unhealthy,
            latency_ms: None,
            message: Some(format!("Database connection failed: {}", e)),
        },
    }
}

/// Check Redis connectivity and latency
async fn check_redis(state: &AppState) -> ServiceHealth {
    let Some(redis) = &state.redis else {
        return ServiceHealth::not_configured();
    };

    let start = Instant::now();
    let mut conn = redis.clone();
    match redis::cmd("PING").query_async::<String>(&mut conn).await {
        Ok(_) => {
            let latency = start.elapsed().as_millis() as u64;
            ServiceHealth {
                status: if latency < 50 {
                    HealthStatus::Healthy
                } else {
                    HealthStatus::Degraded
                },
                latency_ms: Some(latency),
                message: None,
            }
        }
        Err(e) => ServiceHealth {
            status: HealthStatus::Unhealthy,
            latency_ms: None,
            message: Some(format!("Redis connection failed: {}", e)),
        },
    }
}

/// The hub is healthy while its coordinator answers
async fn check_hub(state: &AppState) -> HubHealth {
    let (status, stats) = match state.hub.stats().await {
        Ok(stats) => (HealthStatus::Healthy, stats),
        Err(_) => (HealthStatus::Unhealthy, HubStats::default()),
    };

    HubHealth {
        status,
        active_connections: stats.connections,
        identities: stats.identities,
        dropped_deliveries: stats.dropped_deliveries,
        voice_channels: state.voice.channel_count(),
        collaboration_sessions: state.collaboration.session_count(),
    }
}

/// Determine overall health based on individual checks
fn determine_overall_status(
    db: &ServiceHealth,
    redis: &ServiceHealth,
    hub: HealthStatus,
) -> HealthStatus {
    if hub == HealthStatus::Unhealthy {
        return HealthStatus::Unhealthy;
    }

    // Persistence and presence are side effects; losing them degrades the hub
    if db.status != HealthStatus::Healthy || redis.status != HealthStatus::Healthy {
        return HealthStatus::Degraded;
    }

    HealthStatus::Healthy
}
