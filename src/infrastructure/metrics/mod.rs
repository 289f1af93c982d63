//! Prometheus Metrics Module
//!
//! Provides application-wide metrics collection using Prometheus.
//!
//! # Metrics Collected
//! - HTTP request counts and latency for the query endpoints
//! - Active hub connections
//! - Inbound events by kind and malformed frames
//! - Deliveries dropped on backpressure, by fan-out path
//! - Background task outcomes
//! - Active voice channels and collaboration sessions

use once_cell::sync::Lazy;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};

const NAMESPACE: &str = "realtime_hub";

/// Global metrics registry
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

/// HTTP request counter - tracks total requests by method, path, and status code
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("http_requests_total", "Total number of HTTP requests").namespace(NAMESPACE),
        &["method", "path", "status"],
    )
    .expect("Failed to create HTTP_REQUESTS_TOTAL metric")
});

/// HTTP request latency histogram - tracks request duration in seconds
pub static HTTP_REQUEST_DURATION_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    let buckets = vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0];
    HistogramVec::new(
        HistogramOpts::new(
            "http_request_duration_seconds",
            "HTTP request latency in seconds",
        )
        .namespace(NAMESPACE)
        .buckets(buckets),
        &["method", "path"],
    )
    .expect("Failed to create HTTP_REQUEST_DURATION_SECONDS metric")
});

/// Live connections registered with the hub
pub static HUB_CONNECTIONS_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::with_opts(
        Opts::new("hub_connections_active", "Number of live hub connections").namespace(NAMESPACE),
    )
    .expect("Failed to create HUB_CONNECTIONS_ACTIVE metric")
});

/// Inbound events by classified kind
pub static HUB_INBOUND_EVENTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("hub_inbound_events_total", "Inbound events by kind").namespace(NAMESPACE),
        &["kind"],
    )
    .expect("Failed to create HUB_INBOUND_EVENTS_TOTAL metric")
});

/// Inbound frames discarded because they could not be decoded
pub static HUB_MALFORMED_EVENTS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::with_opts(
        Opts::new("hub_malformed_events_total", "Discarded malformed inbound frames")
            .namespace(NAMESPACE),
    )
    .expect("Failed to create HUB_MALFORMED_EVENTS_TOTAL metric")
});

/// Deliveries dropped because a consumer queue was full
pub static HUB_DELIVERIES_DROPPED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "hub_deliveries_dropped_total",
            "Deliveries dropped on a full outbound queue",
        )
        .namespace(NAMESPACE),
        &["path"], // "broadcast", "direct", "reply", "collab_update", "collab_cursor", "collab_state", "collab_forward"
    )
    .expect("Failed to create HUB_DELIVERIES_DROPPED_TOTAL metric")
});

/// Background task outcomes
pub static BACKGROUND_TASKS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("background_tasks_total", "Background task outcomes").namespace(NAMESPACE),
        &["task", "outcome"], // "ok", "error", "rejected"
    )
    .expect("Failed to create BACKGROUND_TASKS_TOTAL metric")
});

/// Voice channels with at least one participant
pub static VOICE_CHANNELS_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::with_opts(
        Opts::new("voice_channels_active", "Occupied voice channels").namespace(NAMESPACE),
    )
    .expect("Failed to create VOICE_CHANNELS_ACTIVE metric")
});

/// Collaboration sessions held in memory
pub static COLLAB_SESSIONS_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::with_opts(
        Opts::new("collab_sessions_active", "Collaboration sessions in memory")
            .namespace(NAMESPACE),
    )
    .expect("Failed to create COLLAB_SESSIONS_ACTIVE metric")
});

/// Register all metrics with the registry
fn register_metrics(registry: &Registry) {
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .expect("Failed to register HTTP_REQUESTS_TOTAL");
    registry
        .register(Box::new(HTTP_REQUEST_DURATION_SECONDS.clone()))
        .expect("Failed to register HTTP_REQUEST_DURATION_SECONDS");
    registry
        .register(Box::new(HUB_CONNECTIONS_ACTIVE.clone()))
        .expect("Failed to register HUB_CONNECTIONS_ACTIVE");
    registry
        .register(Box::new(HUB_INBOUND_EVENTS_TOTAL.clone()))
        .expect("Failed to register HUB_INBOUND_EVENTS_TOTAL");
    registry
        .register(Box::new(HUB_MALFORMED_EVENTS_TOTAL.clone()))
        .expect("Failed to register HUB_MALFORMED_EVENTS_TOTAL");
    registry
        .register(Box::new(HUB_DELIVERIES_DROPPED_TOTAL.clone()))
        .expect("Failed to register HUB_DELIVERIES_DROPPED_TOTAL");
    registry
        .register(Box::new(BACKGROUND_TASKS_TOTAL.clone()))
        .expect("Failed to register BACKGROUND_TASKS_TOTAL");
    registry
        .register(Box::new(VOICE_CHANNELS_ACTIVE.clone()))
        .expect("Failed to register VOICE_CHANNELS_ACTIVE");
    registry
        .register(Box::new(COLLAB_SESSIONS_ACTIVE.clone()))
        .expect("Failed to register COLLAB_SESSIONS_ACTIVE");
}

/// Collect and encode all metrics as Prometheus text format
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
    }
    String::from_utf8(buffer).unwrap_or_default()
}

/// Helper to record HTTP request metrics
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, &status.to_string()])
        .inc();
    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, path])
        .observe(duration_secs);
}

pub fn set_hub_connections(count: usize) {
    HUB_CONNECTIONS_ACTIVE.set(count as i64);
}

pub fn record_inbound_event(kind: &str) {
    HUB_INBOUND_EVENTS_TOTAL.with_label_values(&[kind]).inc();
}

pub fn record_malformed_event() {
    HUB_MALFORMED_EVENTS_TOTAL.inc();
}

pub fn record_dropped(path: &str, count: usize) {
    if count > 0 {
        HUB_DELIVERIES_DROPPED_TOTAL
            .with_label_values(&[path])
            .inc_by(count as u64);
    }
}

pub fn record_task(task: &str, outcome: &str) {
    BACKGROUND_TASKS_TOTAL
        .with_label_values(&[task, outcome])
        .inc();
}

pub fn set_voice_channels(count: usize) {
    VOICE_CHANNELS_ACTIVE.set(count as i64);
}

pub fn set_collab_sessions(count: usize) {
    COLLAB_SESSIONS_ACTIVE.set(count as i64);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_registration() {
        // Force lazy initialization
        let _ = &*REGISTRY;
        let _ = &*HUB_CONNECTIONS_ACTIVE;
        let _ = &*HUB_DELIVERIES_DROPPED_TOTAL;
        let _ = &*BACKGROUND_TASKS_TOTAL;
    }

    #[test]
    fn test_record_dropped_appears_in_output() {
        record_dropped("broadcast", 3);
        let metrics = gather_metrics();
        assert!(metrics.contains("realtime_hub_hub_deliveries_dropped_total"));
    }

    #[test]
    fn test_record_http_request() {
        record_http_request("GET", "/health", 200, 0.001);
        let metrics = gather_metrics();
        assert!(metrics.contains("http_requests_total"));
    }
}
