//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Active probes (active.rs):
//!     Per-service interval
//!     → GET address + health path for every registered instance
//!     → state.rs decides the transition
//!     → registry updated
//! ```
//!
//! Request-path failures are recorded by the forwarder directly; only a
//! successful probe brings an instance back.

pub mod active;
pub mod state;

pub use active::{HealthProber, ProbeTarget};
