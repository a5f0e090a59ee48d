//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → consumed once at startup to build registry, prober and breakers
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; the instance set never changes at runtime
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use validation::{validate_config, ValidationError};
pub use schema::GatewayConfig;
pub use schema::ListenerConfig;
pub use schema::ServicesConfig;
pub use schema::ServiceConfig;
pub use schema::HealthCheckConfig;
pub use schema::CircuitBreakerConfig;
pub use schema::TimeoutConfig;
pub use schema::ObservabilityConfig;
pub use schema::AdminConfig;
