//! Metrics collection and exposition.
//!
//! # Metrics
//! - `front_requests_total` (counter): gateway requests by method, status
//! - `front_request_duration_seconds` (histogram): gateway latency
//! - `front_endpoint_evictions_total` (counter): failed probes by prefix
//! - `front_registrations_total` (counter): control plane calls by method, outcome
//! - `front_cluster_endpoints` (gauge): live endpoints per prefix

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    counter!(
        "front_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("front_request_duration_seconds").record(start.elapsed().as_secs_f64());
}

pub fn record_eviction(prefix: &str) {
    counter!("front_endpoint_evictions_total", "prefix" => prefix.to_string()).increment(1);
}

pub fn record_registration(method: &str, ok: bool) {
    counter!(
        "front_registrations_total",
        "method" => method.to_string(),
        "outcome" => if ok { "ok" } else { "error" }
    )
    .increment(1);
}

pub fn set_cluster_size(prefix: &str, endpoints: usize) {
    gauge!("front_cluster_endpoints", "prefix" => prefix.to_string()).set(endpoints as f64);
}
