//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request path
//!     → router.rs (route lookup over the service table)
//!     → matcher.rs (segment-aware prefix match)
//!     → Return: service + path after prefix, or NoMatch
//! ```
//!
//! # Design Decisions
//! - Service table is fixed at compile time; instances come from config
//! - No regex in hot path (prefix matching only)
//! - Deterministic: same input always matches same route

pub mod matcher;
pub mod router;

pub use router::{Router, RouteMatch, ServiceRoute, NOTIFICATION, SERVICE_ROUTES, USER};
