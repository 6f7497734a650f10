//! Metrics collection and exposition.
//!
//! # Metrics
//! - `deaddrop_captures_total` (counter): captures by outcome
//! - `deaddrop_capture_bytes_total` (counter): body bytes captured
//! - `deaddrop_replays_total` (counter): replays by outcome
//! - `deaddrop_request_duration_seconds` (histogram): handler latency by operation
//!
//! Outcomes are `ok`, `not_found` or `error`.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Start the Prometheus scrape endpoint on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    let builder = PrometheusBuilder::new().with_http_listener(addr);

    match builder.install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

/// Record a finished capture.
pub fn record_capture(outcome: &'static str, body_bytes: u64, start: Instant) {
    counter!("deaddrop_captures_total", "outcome" => outcome).increment(1);
    if body_bytes > 0 {
        counter!("deaddrop_capture_bytes_total").increment(body_bytes);
    }
    histogram!("deaddrop_request_duration_seconds", "operation" => "capture")
        .record(start.elapsed().as_secs_f64());
}

/// Record a replay up to the point its response starts streaming.
pub fn record_replay(outcome: &'static str, start: Instant) {
    counter!("deaddrop_replays_total", "outcome" => outcome).increment(1);
    histogram!("deaddrop_request_duration_seconds", "operation" => "replay")
        .record(start.elapsed().as_secs_f64());
}
