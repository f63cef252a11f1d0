//! Prometheus metrics for observability.
//!
//! This module provides metrics for monitoring the creatorflow server:
//! - HTTP request metrics (latency, counts)
//! - WebSocket connection metrics
//! - Admission window and call slot occupancy (collected dynamically)
//! - Core metrics registered from `creatorflow_core::metrics`

use once_cell::sync::Lazy;
use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts,
    Registry, TextEncoder,
};

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

// =============================================================================
// HTTP Request Metrics
// =============================================================================

/// HTTP request duration in seconds.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "creatorflow_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0,
        ]),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests total count.
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("creatorflow_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests currently in flight.
pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "creatorflow_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
    )
    .unwrap()
});

// =============================================================================
// WebSocket Metrics
// =============================================================================

/// Active WebSocket connections.
pub static WS_CONNECTIONS_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "creatorflow_ws_connections_active",
        "Number of active WebSocket connections",
    )
    .unwrap()
});

/// Total WebSocket connections (cumulative).
pub static WS_CONNECTIONS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "creatorflow_ws_connections_total",
        "Total WebSocket connections since startup",
    )
    .unwrap()
});

/// WebSocket messages sent by type.
pub static WS_MESSAGES_SENT: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("creatorflow_ws_messages_sent_total", "WebSocket messages sent"),
        &["type"],
    )
    .unwrap()
});

/// WebSocket lag events (when client falls behind).
pub static WS_LAG_EVENTS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "creatorflow_ws_lag_events_total",
        "WebSocket lag events (client fell behind)",
    )
    .unwrap()
});

// =============================================================================
// Occupancy (collected dynamically)
// =============================================================================

/// Admissions still available in the current window.
pub static ADMISSIONS_REMAINING: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "creatorflow_admissions_remaining",
        "Generative admissions still available in the current window",
    )
    .unwrap()
});

/// Whether a call occupies the tracking slot (1) or not (0).
pub static CALL_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "creatorflow_call_active",
        "Whether a call is being tracked (1) or the slot is idle (0)",
    )
    .unwrap()
});

// =============================================================================
// Registration
// =============================================================================

fn register_metrics(registry: &Registry) {
    // HTTP
    registry
        .register(Box::new(HTTP_REQUEST_DURATION.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_IN_FLIGHT.clone()))
        .unwrap();

    // WebSocket
    registry
        .register(Box::new(WS_CONNECTIONS_ACTIVE.clone()))
        .unwrap();
    registry
        .register(Box::new(WS_CONNECTIONS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(WS_MESSAGES_SENT.clone()))
        .unwrap();
    registry.register(Box::new(WS_LAG_EVENTS.clone())).unwrap();

    // Occupancy
    registry
        .register(Box::new(ADMISSIONS_REMAINING.clone()))
        .unwrap();
    registry.register(Box::new(CALL_ACTIVE.clone())).unwrap();

    // Core metrics (admission, generative, pipeline, calls)
    for metric in creatorflow_core::metrics::all_metrics() {
        registry.register(metric).unwrap();
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).unwrap();
    String::from_utf8(buffer).unwrap()
}

/// Refresh gauges that mirror application state.
pub async fn collect_dynamic_metrics(state: &crate::state::AppState) {
    ADMISSIONS_REMAINING.set(state.limiter().remaining().await as i64);
    CALL_ACTIVE.set(if state.calls().snapshot().phase.is_active() {
        1
    } else {
        0
    });
}

/// Normalize a path for metric labels (replace IDs with placeholders).
pub fn normalize_path(path: &str) -> String {
    // Conversation context ids are free-form.
    let conversation_regex = regex_lite::Regex::new(r"^(/api/v1/conversations)/[^/]+").unwrap();
    let uuid_regex = regex_lite::Regex::new(
        r"[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}",
    )
    .unwrap();
    let numeric_regex = regex_lite::Regex::new(r"/\d+(/|$)").unwrap();

    let result = conversation_regex.replace(path, "$1/{id}");
    let result = uuid_regex.replace_all(&result, "{id}");
    let result = numeric_regex.replace_all(&result, "/{id}$1");
    result.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path_conversation() {
        let path = "/api/v1/conversations/cr-001";
        assert_eq!(normalize_path(path), "/api/v1/conversations/{id}");
    }

    #[test]
    fn test_normalize_path_uuid() {
        let path = "/api/v1/things/550e8400-e29b-41d4-a716-446655440000";
        assert_eq!(normalize_path(path), "/api/v1/things/{id}");
    }

    #[test]
    fn test_normalize_path_numeric() {
        let path = "/items/12345";
        assert_eq!(normalize_path(path), "/items/{id}");
    }

    #[test]
    fn test_normalize_path_no_ids() {
        let path = "/api/v1/calls/current";
        assert_eq!(normalize_path(path), "/api/v1/calls/current");
    }

    #[test]
    fn test_encode_metrics_returns_prometheus_format() {
        HTTP_REQUESTS_TOTAL
            .with_label_values(&["GET", "/test", "200"])
            .inc();

        let output = encode_metrics();
        assert!(output.contains("creatorflow_http_requests_total"));
        assert!(output.contains("# HELP"));
        assert!(output.contains("# TYPE"));
    }

    #[test]
    fn test_registry_contains_core_metrics() {
        creatorflow_core::metrics::POLL_TICKS
            .with_label_values(&["pending"])
            .inc();
        creatorflow_core::metrics::STAGE_OUTCOMES
            .with_label_values(&["campaign", "algorithmic_fallback"])
            .inc();
        CALL_ACTIVE.set(0);

        let output = encode_metrics();
        assert!(output.contains("creatorflow_call_active"));
        assert!(output.contains("creatorflow_poll_ticks_total"));
        assert!(output.contains("creatorflow_stage_outcomes_total"));
    }
}
