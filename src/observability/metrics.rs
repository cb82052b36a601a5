//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define edge metrics (requests, latency, failures, feed queue depth)
//! - Expose Prometheus-compatible text on `/metrics`
//!
//! # Metrics
//! - `http_requests_total` (counter): requests by method, route, status class
//! - `http_request_duration_seconds` (histogram): latency distribution
//! - `edge_failures_total` (counter): queue_full, backend_unavailable, backend_timeout, backend_status
//! - `http_panics_total` (counter): handler panics turned into 500s
//! - `feed_messages_total` (counter): messages accepted from the feed
//! - `feed_queue_depth` (gauge): items waiting in the feed queue
//!
//! # Design Decisions
//! - Uses the `metrics` facade; without a recorder every call is a no-op
//! - The recorder is process-global, installed at most once
//! - Histogram buckets tuned for typical web latencies

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::Instant;

const LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0,
];

static HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder (first call) and return its handle.
///
/// Returns `None` if another recorder already owns the global slot.
pub fn init_metrics() -> Option<PrometheusHandle> {
    if let Some(handle) = HANDLE.get() {
        return Some(handle.clone());
    }

    let builder = match PrometheusBuilder::new().set_buckets_for_metric(
        Matcher::Full("http_request_duration_seconds".to_string()),
        LATENCY_BUCKETS,
    ) {
        Ok(builder) => builder,
        Err(e) => {
            tracing::error!(error = %e, "Invalid histogram buckets");
            return None;
        }
    };

    match builder.install_recorder() {
        Ok(handle) => {
            tracing::info!("Prometheus recorder installed");
            Some(HANDLE.get_or_init(|| handle).clone())
        }
        Err(e) => {
            // a concurrent caller may have won the race
            if let Some(handle) = HANDLE.get() {
                return Some(handle.clone());
            }
            tracing::warn!(error = %e, "Metrics recorder already installed elsewhere");
            None
        }
    }
}

/// `2xx`, `4xx`, ... for a status code.
pub fn status_class(status: u16) -> &'static str {
    match status {
        100..=199 => "1xx",
        200..=299 => "2xx",
        300..=399 => "3xx",
        400..=499 => "4xx",
        _ => "5xx",
    }
}

/// Record a completed request.
pub fn record_request(method: &str, route: &str, status: u16, start_time: Instant) {
    let labels = [
        ("method", method.to_string()),
        ("route", route.to_string()),
        ("status_class", status_class(status).to_string()),
    ];
    counter!("http_requests_total", &labels).increment(1);
    histogram!("http_request_duration_seconds", &labels).record(start_time.elapsed().as_secs_f64());
}

/// Failure kinds counted in `edge_failures_total`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    QueueFull,
    BackendUnavailable,
    BackendTimeout,
    BackendStatus,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::QueueFull => "queue_full",
            FailureKind::BackendUnavailable => "backend_unavailable",
            FailureKind::BackendTimeout => "backend_timeout",
            FailureKind::BackendStatus => "backend_status",
        }
    }
}

/// Count a failure. Always incremented, whether or not the caller surfaces it.
pub fn record_failure(kind: FailureKind) {
    counter!("edge_failures_total", "kind" => kind.as_str()).increment(1);
}

/// Count a handler panic caught by the pipeline.
pub fn record_panic() {
    counter!("http_panics_total").increment(1);
}

/// Count a message accepted from the feed.
pub fn record_feed_message() {
    counter!("feed_messages_total").increment(1);
}

/// Current number of items waiting in the feed queue.
pub fn record_queue_depth(depth: usize) {
    gauge!("feed_queue_depth").set(depth as f64);
}
