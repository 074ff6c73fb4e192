//! Metrics collection and exposition.
//!
//! # Metrics
//! - `api_mock_requests_total` (counter): requests by method, status, outcome
//! - `api_mock_request_duration_seconds` (histogram): latency including the artificial delay
//! - `api_mock_passthrough_total` (counter): requests forwarded to the real transport
//! - `api_mock_storage_resets_total` (counter): external storage resets by reason
//! - `api_mock_collections` (gauge): cached collections
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade and is a no-op until an
//!   exporter is installed
//! - The Prometheus exporter is optional and serves its own scrape endpoint

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter listening on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record one handled request.
pub fn record_request(method: &str, status: u16, outcome: &'static str, start: Instant) {
    metrics::counter!(
        "api_mock_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
        "outcome" => outcome,
    )
    .increment(1);
    metrics::histogram!("api_mock_request_duration_seconds", "method" => method.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_passthrough() {
    metrics::counter!("api_mock_passthrough_total").increment(1);
}

/// `reason` is `slot` when the whole storage slot was dropped, `entry` for one collection.
pub fn record_storage_reset(reason: &'static str) {
    metrics::counter!("api_mock_storage_resets_total", "reason" => reason).increment(1);
}

pub fn record_collections(count: usize) {
    metrics::gauge!("api_mock_collections").set(count as f64);
}
