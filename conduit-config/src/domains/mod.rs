//! Domain-specific configuration modules

pub mod database;
pub mod http;
pub mod logging;
pub mod mcp;
pub mod utils;

use crate::error::ConfigResult;
use crate::validation::Validatable;
use serde::{Deserialize, Serialize};

/// Top-level daemon configuration combining every ambient domain plus
/// the MCP domain (§6 config inputs).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ConduitConfig {
    /// Metadata store connection configuration.
    #[serde(default)]
    pub database: database::DatabaseConfig,

    /// Outbound HTTP client configuration (config-store / blob-store
    /// requests, Cognito JWKS fetches).
    #[serde(default)]
    pub http: http::HttpConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: logging::LoggingConfig,

    /// MCP daemon configuration: transport, auth, blob store, rate
    /// limiting, SSE, and the materialised config cache.
    #[serde(default)]
    pub mcp: mcp::McpConfig,
}

impl ConduitConfig {
    /// Validate every domain configuration.
    pub fn validate_all(&self) -> ConfigResult<()> {
        self.database.validate()?;
        self.http.validate()?;
        self.logging.validate()?;
        self.mcp.validate()?;
        Ok(())
    }

    /// Generate a sample configuration file.
    pub fn generate_sample() -> String {
        let config = ConduitConfig::default();
        serde_yaml::to_string(&config)
            .unwrap_or_else(|_| "# Failed to generate sample config".to_string())
    }
}
