//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request id, trace, timeout)
//!     → routing resolves the service from the path prefix
//!     → request.rs (buffer body, build InboundRequest)
//!     → proxy::Gateway
//!     → response.rs (ProxyResponse into an axum Response)
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{MakeRequestUuid, X_REQUEST_ID};
pub use server::{AppState, HttpServer};
