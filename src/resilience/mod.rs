//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Request to service:
//!     → circuit_breaker.rs (fail fast while the service is known to be down)
//!     → forwarder retry loop (one attempt per registered instance)
//!     → timeouts.rs (enforce response deadline on every attempt)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every external call has a deadline
//! - Instance-level failures are retried on another instance without backoff
//! - Circuit breaker stops retry storms when the whole service is down

pub mod circuit_breaker;
pub mod timeouts;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerPolicy, CircuitState};
