//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate instance URLs (parsable, plain HTTP, no duplicates)
//! - Validate value ranges (timeouts > 0, threshold in (0, 100])
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - A service without instances is accepted; requests to it fail with 503

use std::net::SocketAddr;
use thiserror::Error;
use url::Url;

use crate::config::schema::{GatewayConfig, ServiceConfig};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ValidationError {
    #[error("{service}: invalid instance URL '{url}': {reason}")]
    InvalidInstanceUrl { service: String, url: String, reason: String },

    #[error("{service}: duplicate instance '{url}'")]
    DuplicateInstance { service: String, url: String },

    #[error("{field} must be greater than zero")]
    NotPositive { field: String },

    #[error("circuit_breaker.failure_rate_threshold must be in (0, 100], got {0}")]
    ThresholdOutOfRange(f64),

    #[error("circuit_breaker.minimum_calls must be between 1 and sliding_window_size ({window}), got {minimum}")]
    MinimumCallsOutOfRange { minimum: usize, window: usize },

    #[error("{field}: invalid socket address '{value}'")]
    InvalidAddress { field: String, value: String },

    #[error("{service}: health_path '{path}' must start with '/'")]
    InvalidHealthPath { service: String, path: String },

    #[error(
        "timeouts.request_secs ({request_ms}ms) must cover failover across every {service} \
         instance ({required_ms}ms of connect and response timeouts)"
    )]
    RequestTimeoutTooShort { service: String, request_ms: u64, required_ms: u64 },
}

/// Validate a configuration, collecting every error.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_address(&mut errors, "listener.bind_address", &config.listener.bind_address);
    if config.listener.max_body_bytes == 0 {
        errors.push(not_positive("listener.max_body_bytes"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(not_positive("timeouts.request_secs"));
    }

    check_service(&mut errors, "user", &config.services.user);
    check_service(&mut errors, "notification", &config.services.notification);
    check_request_budget(&mut errors, config, "user", &config.services.user);
    check_request_budget(&mut errors, config, "notification", &config.services.notification);

    let cb = &config.circuit_breaker;
    if !(cb.failure_rate_threshold > 0.0 && cb.failure_rate_threshold <= 100.0) {
        errors.push(ValidationError::ThresholdOutOfRange(cb.failure_rate_threshold));
    }
    if cb.sliding_window_size == 0 {
        errors.push(not_positive("circuit_breaker.sliding_window_size"));
    } else if cb.minimum_calls == 0 || cb.minimum_calls > cb.sliding_window_size {
        errors.push(ValidationError::MinimumCallsOutOfRange {
            minimum: cb.minimum_calls,
            window: cb.sliding_window_size,
        });
    }
    if cb.reset_timeout_secs == 0 {
        errors.push(not_positive("circuit_breaker.reset_timeout_secs"));
    }

    if config.observability.metrics_enabled {
        check_address(&mut errors, "observability.metrics_address", &config.observability.metrics_address);
    }
    if config.admin.enabled {
        check_address(&mut errors, "admin.bind_address", &config.admin.bind_address);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_service(errors: &mut Vec<ValidationError>, name: &str, service: &ServiceConfig) {
    let instances = service.instances_or_single();
    if instances.is_empty() {
        tracing::warn!(service = %name, "No instances configured; requests will be rejected");
    }

    let mut seen: Vec<String> = Vec::with_capacity(instances.len());
    for raw in &instances {
        match Url::parse(raw) {
            Ok(url) if url.scheme() != "http" => errors.push(ValidationError::InvalidInstanceUrl {
                service: name.to_string(),
                url: raw.clone(),
                reason: format!("unsupported scheme '{}'", url.scheme()),
            }),
            Ok(url) if url.host_str().is_none() => errors.push(ValidationError::InvalidInstanceUrl {
                service: name.to_string(),
                url: raw.clone(),
                reason: "missing host".to_string(),
            }),
            Ok(_) => {}
            Err(e) => errors.push(ValidationError::InvalidInstanceUrl {
                service: name.to_string(),
                url: raw.clone(),
                reason: e.to_string(),
            }),
        }

        let normalized = raw.trim_end_matches('/').to_string();
        if seen.contains(&normalized) {
            errors.push(ValidationError::DuplicateInstance {
                service: name.to_string(),
                url: raw.clone(),
            });
        } else {
            seen.push(normalized);
        }
    }

    let durations = [
        ("connect_timeout_ms", service.connect_timeout_ms),
        ("response_timeout_ms", service.response_timeout_ms),
        ("health_check_interval_secs", service.health_check_interval_secs),
        ("health_check_timeout_ms", service.health_check_timeout_ms),
    ];
    for (field, value) in durations {
        if value == 0 {
            errors.push(not_positive(&format!("services.{name}.{field}")));
        }
    }
    if service.max_response_bytes == 0 {
        errors.push(not_positive(&format!("services.{name}.max_response_bytes")));
    }

    if let Some(path) = service.health_path.as_deref().filter(|p| !p.starts_with('/')) {
        errors.push(ValidationError::InvalidHealthPath {
            service: name.to_string(),
            path: path.to_string(),
        });
    }
}

/// The inbound request timeout must outlast one attempt per instance,
/// otherwise it cancels the forward before a hung instance is marked failed.
fn check_request_budget(
    errors: &mut Vec<ValidationError>,
    config: &GatewayConfig,
    name: &str,
    service: &ServiceConfig,
) {
    let attempts = service.instances_or_single().len() as u64;
    if attempts == 0 {
        return;
    }
    let request_ms = config.timeouts.request_secs.saturating_mul(1000);
    let required_ms = service
        .connect_timeout_ms
        .saturating_add(service.response_timeout_ms)
        .saturating_mul(attempts);
    if request_ms < required_ms {
        errors.push(ValidationError::RequestTimeoutTooShort {
            service: name.to_string(),
            request_ms,
            required_ms,
        });
    }
}

fn check_address(errors: &mut Vec<ValidationError>, field: &str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: field.to_string(),
            value: value.to_string(),
        });
    }
}

fn not_positive(field: &str) -> ValidationError {
    ValidationError::NotPositive {
        field: field.to_string(),
    }
}
