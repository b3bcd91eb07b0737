//! Domain-driven configuration management for the daemon.
//!
//! Configuration is split by functional domain (database, http, logging,
//! mcp), each independently validated and independently overridable from
//! the environment, then composed into one [`ConduitConfig`] loaded at
//! startup by `conduit-server`/`conduit-cli`.

pub mod error;
pub mod loader;
pub mod validation;

// Domain-specific configuration modules
pub mod domains;

// Re-export main types
pub use error::{ConfigError, ConfigResult};
pub use loader::ConfigLoader;

// Re-export domain configurations
pub use domains::{
    database::DatabaseConfig, http::HttpConfig, logging::LoggingConfig, mcp::McpConfig,
    ConduitConfig,
};

// Re-export utilities
pub use domains::utils::serde_duration;
