//! Metrics collection and exposition.
//!
//! # Metrics
//! - `rpc_balancer_picks_total` (counter): picks by strategy and result
//! - `rpc_balancer_picker_rebuilds_total` (counter): rebuilds by strategy
//! - `rpc_balancer_ready_connections` (gauge): ready handles per target
//! - `rpc_balancer_resolver_updates_total` (counter): pushes per service
//! - `rpc_balancer_endpoints` (gauge): configured endpoints per service
//!
//! Recording is a no-op until [`init_metrics`] installs the exporter.

use std::net::SocketAddr;
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder with an HTTP scrape listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_pick(strategy: &str, ok: bool) {
    let result = if ok { "ok" } else { "unavailable" };
    ::metrics::counter!(
        "rpc_balancer_picks_total",
        "strategy" => strategy.to_string(),
        "result" => result
    )
    .increment(1);
}

pub fn record_picker_rebuild(strategy: &str, target: &str, ready: usize) {
    ::metrics::counter!("rpc_balancer_picker_rebuilds_total", "strategy" => strategy.to_string())
        .increment(1);
    ::metrics::gauge!("rpc_balancer_ready_connections", "target" => target.to_string())
        .set(ready as f64);
}

pub fn record_resolver_update(service: &str) {
    ::metrics::counter!("rpc_balancer_resolver_updates_total", "service" => service.to_string())
        .increment(1);
}

pub fn record_endpoint_count(service: &str, endpoints: usize) {
    ::metrics::gauge!("rpc_balancer_endpoints", "service" => service.to_string())
        .set(endpoints as f64);
}
