//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Registry, prober, forwarder, breaker produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → stdout (fmt subscriber, EnvFilter)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Named fields on every event (service, address, attempt)
//! - Request ID from the HTTP layer flows to backends as a header
//! - Metrics are cheap when no exporter is installed

pub mod logging;
pub mod metrics;
