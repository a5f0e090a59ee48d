//! Proxy core.
//!
//! # Data Flow
//! ```text
//! gateway.rs (method check, breaker, fallback)
//!     → forwarder.rs (select → send → on failure mark & retry)
//!     → headers.rs (strip Host / Content-Length upstream, framing downstream)
//!     → transport.rs (hyper client, connect timeout + response deadline)
//! ```
//!
//! # Design Decisions
//! - Transport is a trait so the core runs against scripted backends in tests
//! - Request and response bodies are buffered; nothing rewrites them

pub mod forwarder;
pub mod gateway;
pub mod headers;
pub mod transport;

pub use forwarder::Forwarder;
pub use gateway::{Gateway, InboundRequest, ProxyResponse};
pub use transport::{HyperTransport, Transport, UpstreamRequest, UpstreamResponse};
