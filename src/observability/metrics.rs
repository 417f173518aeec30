//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by gate outcome
//! - `gateway_gate_denials_total` (counter): denials by reason
//! - `gateway_route_rebuilds_total` (counter): route table rebuilds
//! - `gateway_active_modules` (gauge): modules in the active set
//! - `gateway_module_operations_total` (counter): admin operations by result

use ::metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_gate_outcome(outcome: &'static str) {
    counter!("gateway_requests_total", "outcome" => outcome).increment(1);
}

pub fn record_gate_denial(reason: &'static str) {
    counter!("gateway_gate_denials_total", "reason" => reason).increment(1);
}

pub fn record_route_rebuild(bindings: usize) {
    counter!("gateway_route_rebuilds_total").increment(1);
    gauge!("gateway_route_bindings").set(bindings as f64);
}

pub fn record_active_modules(count: usize) {
    gauge!("gateway_active_modules").set(count as f64);
}

pub fn record_module_operation(operation: &'static str, success: bool) {
    let result = if success { "success" } else { "failure" };
    counter!("gateway_module_operations_total", "operation" => operation, "result" => result)
        .increment(1);
}
