//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::proxy::transport::DEFAULT_MAX_RESPONSE_BYTES;

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address, body limit).
    pub listener: ListenerConfig,

    /// Backend services fronted by the gateway.
    pub services: ServicesConfig,

    /// Health check settings shared by all services.
    pub health_check: HealthCheckConfig,

    /// Per-service circuit breaker policy.
    pub circuit_breaker: CircuitBreakerConfig,

    /// Timeout configuration for inbound requests.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Admin API settings.
    pub admin: AdminConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Largest inbound request body buffered for forwarding.
    pub max_body_bytes: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            max_body_bytes: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// The backend services.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServicesConfig {
    pub user: ServiceConfig,
    pub notification: ServiceConfig,
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            user: ServiceConfig {
                base_url: Some("http://localhost:8081".to_string()),
                ..ServiceConfig::default()
            },
            notification: ServiceConfig {
                base_url: Some("http://localhost:8082".to_string()),
                ..ServiceConfig::default()
            },
        }
    }
}

impl ServicesConfig {
    /// Look up a service by name.
    pub fn get(&self, name: &str) -> Option<&ServiceConfig> {
        match name {
            "user" => Some(&self.user),
            "notification" => Some(&self.notification),
            _ => None,
        }
    }
}

/// Configuration of a single backend service.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Legacy single-instance base URL, used when `instances` is empty.
    pub base_url: Option<String>,

    /// Instance base URLs (e.g., "http://10.0.0.5:8081").
    pub instances: Vec<String>,

    /// Connection establishment timeout in milliseconds.
    pub connect_timeout_ms: u64,

    /// Time allowed for a full response in milliseconds.
    pub response_timeout_ms: u64,

    /// Delay between health check cycles in seconds.
    pub health_check_interval_secs: u64,

    /// Health probe timeout in milliseconds.
    pub health_check_timeout_ms: u64,

    /// Health endpoint path; the service default when unset.
    pub health_path: Option<String>,

    /// Largest upstream response body buffered, in bytes.
    pub max_response_bytes: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            instances: Vec::new(),
            connect_timeout_ms: 2000,
            response_timeout_ms: 5000,
            health_check_interval_secs: 30,
            health_check_timeout_ms: 3000,
            health_path: None,
            max_response_bytes: DEFAULT_MAX_RESPONSE_BYTES,
        }
    }
}

impl ServiceConfig {
    /// The instance list, or the single base URL when no list is given.
    pub fn instances_or_single(&self) -> Vec<String> {
        if !self.instances.is_empty() {
            return self.instances.clone();
        }
        self.base_url
            .iter()
            .filter(|url| !url.is_empty())
            .cloned()
            .collect()
    }
}

/// Health check configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthCheckConfig {
    /// Enable active health checks.
    pub enabled: bool,

    /// Minimum age of a failure before a failing probe re-stamps it.
    pub failure_cooldown_secs: u64,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            failure_cooldown_secs: 30,
        }
    }
}

/// Circuit breaker configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Enable per-service circuit breaking.
    pub enabled: bool,

    /// Failure percentage (0-100] at which the circuit opens.
    pub failure_rate_threshold: f64,

    /// Number of most recent calls the failure rate is computed over.
    pub sliding_window_size: usize,

    /// Calls required before the failure rate is evaluated.
    pub minimum_calls: usize,

    /// Seconds spent open before a trial request is let through.
    pub reset_timeout_secs: u64,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            failure_rate_threshold: 50.0,
            sliding_window_size: 10,
            minimum_calls: 5,
            reset_timeout_secs: 30,
        }
    }
}

/// Timeout configuration for inbound requests.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Total time allowed for an inbound request in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 60 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable the admin API.
    pub enabled: bool,

    /// Admin API bind address.
    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bind_address: "127.0.0.1:8090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instances_take_precedence() {
        let service = ServiceConfig {
            base_url: Some("http://legacy:8081".into()),
            instances: vec!["http://a:8081".into(), "http://b:8081".into()],
            ..ServiceConfig::default()
        };
        assert_eq!(service.instances_or_single(), vec!["http://a:8081", "http://b:8081"]);
    }

    #[test]
    fn test_single_base_url_fallback() {
        let service = ServiceConfig {
            base_url: Some("http://legacy:8081".into()),
            ..ServiceConfig::default()
        };
        assert_eq!(service.instances_or_single(), vec!["http://legacy:8081"]);

        let empty = ServiceConfig {
            base_url: Some(String::new()),
            ..ServiceConfig::default()
        };
        assert!(empty.instances_or_single().is_empty());
        assert!(ServiceConfig::default().instances_or_single().is_empty());
    }

    #[test]
    fn test_defaults() {
        let config = GatewayConfig::default();
        assert_eq!(config.services.user.base_url.as_deref(), Some("http://localhost:8081"));
        assert_eq!(config.services.user.connect_timeout_ms, 2000);
        assert_eq!(config.services.notification.response_timeout_ms, 5000);
        assert_eq!(config.health_check.failure_cooldown_secs, 30);
        assert!(config.services.get("billing").is_none());
    }
}
