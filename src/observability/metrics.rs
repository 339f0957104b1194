//! Metrics collection and exposition.
//!
//! # Metrics
//! - `qflask_requests_total` (counter): requests by method, status, endpoint
//! - `qflask_request_duration_seconds` (histogram): dispatch latency
//! - `qflask_dispatch_errors_total` (counter): escaped failures by kind
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   recorder every call is a no-op, so tests need no setup
//! - The Prometheus exporter serves its own listener

use std::net::SocketAddr;
use std::time::Instant;

use metrics::Label;
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape listener.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

/// Record one finished request.
pub fn record_request(method: &str, status: u16, endpoint: &str, started: Instant) {
    let labels = vec![
        Label::new("method", method.to_string()),
        Label::new("status", status.to_string()),
        Label::new("endpoint", endpoint.to_string()),
    ];
    metrics::counter!("qflask_requests_total", labels.clone()).increment(1);
    metrics::histogram!("qflask_request_duration_seconds", labels)
        .record(started.elapsed().as_secs_f64());
}

/// Record a failure that reached the last-resort handler.
pub fn record_dispatch_error(kind: &'static str) {
    metrics::counter!("qflask_dispatch_errors_total", "kind" => kind).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_without_recorder_is_noop() {
        record_request("GET", 200, "index", Instant::now());
        record_dispatch_error("handler");
    }
}
