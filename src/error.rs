//! Gateway error definitions.

use std::time::Duration;
use axum::http::Method;
use thiserror::Error;

/// Failure of a single outbound call, as opposed to an HTTP error status.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// TCP connect failed or was refused.
    #[error("connect error: {0}")]
    Connect(String),

    /// No complete response within the response timeout.
    #[error("timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    /// Connection broke while sending or reading the response.
    #[error("io error: {0}")]
    Io(String),

    /// The upstream request could not be built (bad URL, bad header).
    #[error("invalid upstream request: {0}")]
    InvalidRequest(String),
}

/// Errors surfaced by the routing/forwarding core.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The service has zero registered instances.
    #[error("no instances registered for service '{service}'")]
    NoInstances { service: String },

    /// Every attempt in the retry budget failed at the transport level.
    #[error("all {service} instances failed after {attempts} attempts: {source}")]
    AllInstancesExhausted {
        service: String,
        attempts: usize,
        #[source]
        source: TransportError,
    },

    /// The service circuit breaker is open.
    #[error("circuit breaker for service '{service}' is open")]
    CircuitOpen { service: String },

    /// Only GET, POST, PUT and DELETE are forwarded.
    #[error("method {0} is not allowed")]
    MethodNotAllowed(Method),
}

impl GatewayError {
    /// Whether the circuit breaker should count this error as a failed call.
    pub fn is_service_failure(&self) -> bool {
        matches!(
            self,
            GatewayError::NoInstances { .. } | GatewayError::AllInstancesExhausted { .. }
        )
    }
}
