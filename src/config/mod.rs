//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → shared via Arc to all subsystems
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart (the route
//!   table is immutable during dispatch by specification)
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    CacheTuning, GatewayConfig, ListenerConfig, LogFormat, ObservabilityConfig, RetryConfig,
    RouteConfig, StorageConfig, StrategyKind, TimeoutConfig, UpstreamConfig,
};
pub use validation::{validate_config, ValidationError};
