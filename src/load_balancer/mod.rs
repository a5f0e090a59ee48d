//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Route matched → service name identified
//!     → registry.rs (available instances of the service)
//!     → round_robin.rs (rotate through the candidates)
//!         - no instance available: rotate through every registered instance
//!     → Return instance address or NoInstances
//! ```
//!
//! # Design Decisions
//! - Registry is the only owner of instance state; callers never see its maps
//! - One lock per service, never held across outbound I/O
//! - Unavailable instances excluded from selection unless all are down
//! - Cursors are per service and never reset

pub mod instance;
pub mod registry;
pub mod round_robin;

pub use instance::{Instance, InstanceState};
pub use registry::{InstanceRegistry, InstanceSnapshot};
pub use round_robin::Selector;
