//! Metrics collection and exposition.
//!
//! # Metrics
//! - `relay_rpc_calls_total` (counter): calls by service, method, outcome
//! - `relay_rpc_duration_seconds` (histogram): processing latency per service
//! - `relay_backend_calls_total` (counter): backend calls by method, outcome
//! - `relay_backend_connections` (gauge): open backend sockets
//! - `relay_cache_lookups_total` (counter): fetch cache lookups by result
//! - `relay_cache_entries` (gauge): cached communications

use std::net::SocketAddr;
use std::time::Duration;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter with an HTTP listener on `addr`.
///
/// Must be called from within a tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => {
            tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter")
        }
    }
}

pub fn record_rpc_call(
    service: &'static str,
    method: &str,
    outcome: &'static str,
    elapsed: Duration,
) {
    metrics::counter!(
        "relay_rpc_calls_total",
        "service" => service,
        "method" => method.to_string(),
        "outcome" => outcome
    )
    .increment(1);
    metrics::histogram!("relay_rpc_duration_seconds", "service" => service)
        .record(elapsed.as_secs_f64());
}

pub fn record_backend_call(method: &str, outcome: &'static str) {
    metrics::counter!(
        "relay_backend_calls_total",
        "method" => method.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

pub fn backend_connection_opened() {
    metrics::gauge!("relay_backend_connections").increment(1.0);
}

pub fn backend_connection_closed() {
    metrics::gauge!("relay_backend_connections").decrement(1.0);
}

pub fn record_cache_lookup(hit: bool) {
    let result = if hit { "hit" } else { "miss" };
    metrics::counter!("relay_cache_lookups_total", "result" => result).increment(1);
}

pub fn set_cache_entries(entries: usize) {
    metrics::gauge!("relay_cache_entries").set(entries as f64);
}
