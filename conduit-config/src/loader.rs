//! Configuration loading and environment variable handling

use crate::domains::ConduitConfig;
use crate::error::{ConfigError, ConfigResult};
use std::path::Path;

/// Configuration loader with environment variable support
pub struct ConfigLoader {
    /// Environment variable prefix
    prefix: String,
}

impl ConfigLoader {
    /// Create a new config loader with default prefix
    pub fn new() -> Self {
        Self {
            prefix: "CONDUIT".to_string(),
        }
    }

    /// Create a new config loader with custom prefix
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Load configuration from a YAML file with environment overrides
    pub fn from_file(&self, path: impl AsRef<Path>) -> ConfigResult<ConduitConfig> {
        let content = std::fs::read_to_string(path)?;
        let mut config: ConduitConfig = serde_yaml::from_str(&content)?;

        self.apply_env_overrides(&mut config)?;
        config.validate_all()?;

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env(&self) -> ConfigResult<ConduitConfig> {
        let mut config = ConduitConfig::default();
        self.apply_env_overrides(&mut config)?;
        config.validate_all()?;
        Ok(config)
    }

    /// Load configuration with fallback chain
    pub fn load(&self, config_path: Option<impl AsRef<Path>>) -> ConfigResult<ConduitConfig> {
        match config_path {
            Some(path) => self.from_file(path),
            None => self.from_env(),
        }
    }

    /// Apply environment variable overrides to configuration
    fn apply_env_overrides(&self, config: &mut ConduitConfig) -> ConfigResult<()> {
        self.apply_database_overrides(&mut config.database)?;
        self.apply_http_overrides(&mut config.http)?;
        self.apply_logging_overrides(&mut config.logging)?;
        self.apply_mcp_overrides(&mut config.mcp)?;
        Ok(())
    }

    fn apply_database_overrides(
        &self,
        config: &mut crate::domains::database::DatabaseConfig,
    ) -> ConfigResult<()> {
        if let Ok(url) = self.get_env_var("DATABASE_URL") {
            config.url = url;
        }

        if let Ok(max_conn) = self.get_env_var("DATABASE_MAX_CONNECTIONS") {
            config.max_connections = max_conn
                .parse()
                .map_err(|e| ConfigError::EnvError(format!("Invalid DATABASE_MAX_CONNECTIONS: {e}")))?;
        }

        Ok(())
    }

    fn apply_http_overrides(
        &self,
        config: &mut crate::domains::http::HttpConfig,
    ) -> ConfigResult<()> {
        if let Ok(timeout) = self.get_env_var("HTTP_TIMEOUT") {
            let seconds: u64 = timeout
                .parse()
                .map_err(|e| ConfigError::EnvError(format!("Invalid HTTP_TIMEOUT: {e}")))?;
            config.timeout = std::time::Duration::from_secs(seconds);
        }

        if let Ok(user_agent) = self.get_env_var("HTTP_USER_AGENT") {
            config.user_agent = user_agent;
        }

        if let Ok(verify_ssl) = self.get_env_var("HTTP_VERIFY_SSL") {
            config.verify_ssl = verify_ssl
                .parse()
                .map_err(|e| ConfigError::EnvError(format!("Invalid HTTP_VERIFY_SSL: {e}")))?;
        }

        Ok(())
    }

    fn apply_logging_overrides(
        &self,
        config: &mut crate::domains::logging::LoggingConfig,
    ) -> ConfigResult<()> {
        if let Ok(log_level) = self.get_env_var("LOG_LEVEL") {
            use std::str::FromStr;
            config.level = crate::domains::logging::LogLevel::from_str(&log_level)
                .map_err(|_| ConfigError::EnvError(format!("Invalid LOG_LEVEL: {log_level}")))?;
        }

        if let Ok(format) = self.get_env_var("LOG_FORMAT") {
            use std::str::FromStr;
            config.format = crate::domains::logging::LogFormat::from_str(&format)
                .map_err(|_| ConfigError::EnvError(format!("Invalid LOG_FORMAT: {format}")))?;
        }

        Ok(())
    }

    /// Apply MCP config overrides using the daemon's own operator-facing
    /// variable names (`MCP_PORT`, `MCP_AUTH_PROVIDER`, ...) rather than
    /// the generic `{PREFIX}_MCP_*` scheme the other domains use.
    fn apply_mcp_overrides(
        &self,
        config: &mut crate::domains::mcp::McpConfig,
    ) -> ConfigResult<()> {
        if let Ok(transport) = self.get_env_var("MCP_TRANSPORT") {
            config.transport = transport;
        }

        if let Ok(host) = self.get_env_var("MCP_HOST") {
            config.host = host;
        }

        if let Ok(port) = self.get_env_var("MCP_PORT") {
            config.port = port
                .parse()
                .map_err(|e| ConfigError::EnvError(format!("Invalid MCP_PORT: {e}")))?;
        }

        if let Ok(url) = self.get_env_var("MCP_CONFIG_STORE_URL") {
            config.config_store_url = url;
        }

        if let Ok(provider) = self.get_env_var("MCP_AUTH_PROVIDER") {
            config.auth.auth_provider = provider;
        }

        if let Ok(secret) = self.get_env_var("MCP_JWT_SECRET") {
            config.auth.jwt_secret = Some(secret);
        }

        if let Ok(token) = self.get_env_var("MCP_ADMIN_STATIC_TOKEN") {
            config.auth.admin_static_token = Some(token);
        }

        if let Ok(pool_id) = self.get_env_var("MCP_COGNITO_USER_POOL_ID") {
            config.auth.cognito_user_pool_id = Some(pool_id);
        }

        if let Ok(client_id) = self.get_env_var("MCP_COGNITO_APP_CLIENT_ID") {
            config.auth.cognito_app_client_id = Some(client_id);
        }

        if let Ok(region) = self.get_env_var("MCP_REGION") {
            config.auth.region = Some(region);
        }

        if let Ok(creds) = self.get_env_var("MCP_BLOB_CREDENTIALS") {
            config.blob.blob_credentials = Some(creds);
        }

        if let Ok(bucket) = self.get_env_var("MCP_FUNCT_BUCKET_NAME") {
            config.blob.funct_bucket_name = Some(bucket);
        }

        if let Ok(depth) = self.get_env_var("MCP_CASCADE_DEPTH") {
            config.cache.cascade_depth = depth
                .parse()
                .map_err(|e| ConfigError::EnvError(format!("Invalid MCP_CASCADE_DEPTH: {e}")))?;
        }

        Ok(())
    }

    /// Get environment variable with prefix
    fn get_env_var(&self, name: &str) -> Result<String, std::env::VarError> {
        std::env::var(format!("{}_{}", self.prefix, name))
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_defaults_from_empty_environment() {
        let loader = ConfigLoader::with_prefix("CONDUIT_TEST_UNSET_PREFIX");
        let config = loader.from_env().unwrap();
        assert_eq!(config.mcp.transport, "sse");
        assert_eq!(config.mcp.port, 3001);
    }

    #[test]
    fn mcp_port_override_is_applied() {
        std::env::set_var("CONDUIT_LOADER_TEST_MCP_PORT", "9999");
        let loader = ConfigLoader::with_prefix("CONDUIT_LOADER_TEST");
        let config = loader.from_env().unwrap();
        assert_eq!(config.mcp.port, 9999);
        std::env::remove_var("CONDUIT_LOADER_TEST_MCP_PORT");
    }
}
