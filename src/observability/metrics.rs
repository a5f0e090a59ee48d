//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by service, status
//! - `gateway_request_duration_seconds` (histogram): latency per service
//! - `gateway_forward_failures_total` (counter): transport failures per instance
//! - `gateway_instance_available` (gauge): 1=available, 0=unavailable
//! - `gateway_circuit_state` (gauge): 0=closed, 1=half-open, 2=open
//!
//! Recording is a no-op until `init_metrics` installs the exporter.

use std::net::SocketAddr;
use std::time::Instant;
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::resilience::circuit_breaker::CircuitState;

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(service: &str, status: u16, start: Instant) {
    metrics::counter!(
        "gateway_requests_total",
        "service" => service.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("gateway_request_duration_seconds", "service" => service.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_forward_failure(service: &str, instance: &str) {
    metrics::counter!(
        "gateway_forward_failures_total",
        "service" => service.to_string(),
        "instance" => instance.to_string()
    )
    .increment(1);
}

pub fn record_instance_availability(service: &str, instance: &str, available: bool) {
    metrics::gauge!(
        "gateway_instance_available",
        "service" => service.to_string(),
        "instance" => instance.to_string()
    )
    .set(if available { 1.0 } else { 0.0 });
}

pub fn record_circuit_state(service: &str, state: CircuitState) {
    let value = match state {
        CircuitState::Closed => 0.0,
        CircuitState::HalfOpen => 1.0,
        CircuitState::Open => 2.0,
    };
    metrics::gauge!("gateway_circuit_state", "service" => service.to_string()).set(value);
}
