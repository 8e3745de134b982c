//! Metrics collection and exposition.
//!
//! # Metrics
//! - `edge_guard_requests_admitted_total` (counter)
//! - `edge_guard_requests_rejected_total` (counter): by `reason`
//! - `edge_guard_rate_limit_evictions_total` (counter): windows removed by the sweeper
//! - `edge_guard_rate_limit_tracked_keys` (gauge): keys left after a sweep
//! - `edge_guard_upstream_requests_total` (counter): by `status`
//! - `edge_guard_upstream_duration_seconds` (histogram)

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_admitted() {
    ::metrics::counter!("edge_guard_requests_admitted_total").increment(1);
}

pub fn record_rejected(reason: &'static str) {
    ::metrics::counter!("edge_guard_requests_rejected_total", "reason" => reason).increment(1);
}

pub fn record_sweep(removed: usize, remaining: usize) {
    ::metrics::counter!("edge_guard_rate_limit_evictions_total").increment(removed as u64);
    ::metrics::gauge!("edge_guard_rate_limit_tracked_keys").set(remaining as f64);
}

pub fn record_upstream(status: u16, start: Instant) {
    ::metrics::counter!("edge_guard_upstream_requests_total", "status" => status.to_string())
        .increment(1);
    ::metrics::histogram!("edge_guard_upstream_duration_seconds")
        .record(start.elapsed().as_secs_f64());
}
