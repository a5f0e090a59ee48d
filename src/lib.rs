//! HTTP API gateway.
//!
//! Fronts the user and notification services, spreading requests over
//! several instances of each with round-robin selection, failover on
//! transport errors, active health probing and a per-service circuit
//! breaker with a 503 fallback.

// Core subsystems
pub mod config;
pub mod http;
pub mod proxy;
pub mod routing;

// Traffic management
pub mod health;
pub mod load_balancer;

// Cross-cutting concerns
pub mod admin;
pub mod error;
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use config::schema::GatewayConfig;
pub use error::{GatewayError, TransportError};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use proxy::{Gateway, InboundRequest, ProxyResponse};
