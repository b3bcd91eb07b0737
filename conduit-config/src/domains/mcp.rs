//! MCP (Model Context Protocol) daemon configuration (§6 config inputs).

use crate::error::ConfigResult;
use crate::validation::Validatable;
use serde::{Deserialize, Serialize};

/// MCP daemon configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct McpConfig {
    /// Whether the MCP server is enabled.
    #[serde(default = "crate::domains::utils::default_false")]
    pub enabled: bool,

    /// Transport protocol ("sse" or "stdio").
    #[serde(default = "default_mcp_transport")]
    pub transport: String,

    /// Host address for the SSE transport.
    #[serde(default = "default_mcp_host")]
    pub host: String,

    /// Port for the SSE transport.
    #[serde(default = "default_mcp_port")]
    pub port: u16,

    /// GraphQL endpoint `mcp_core_graphql` queries and mutations are sent
    /// to (`GraphQlConfigStoreClient`'s transport target).
    #[serde(default = "default_config_store_url")]
    pub config_store_url: String,

    /// Optional statically preloaded configuration for the `"default"`
    /// partition, as a bulk `McpConfigurationDocument` JSON value
    /// (§4.B) — served directly, bypassing the upstream query.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mcp_configuration: Option<serde_json::Value>,

    pub auth: McpAuthConfig,
    pub blob: McpBlobConfig,
    pub rate_limit: McpRateLimitConfig,
    pub sse: McpSseConfig,
    pub cache: McpCacheConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct McpAuthConfig {
    /// "local", "cognito", or "api_gateway".
    #[serde(default = "default_auth_provider")]
    pub auth_provider: String,
    #[serde(default = "default_jwt_algorithm")]
    pub jwt_algorithm: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jwt_secret: Option<String>,
    #[serde(default = "default_access_token_exp_minutes")]
    pub access_token_exp_minutes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_user_file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_static_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cognito_user_pool_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cognito_app_client_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cognito_app_secret: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cognito_jwks_url: Option<String>,
    #[serde(default = "default_jwks_cache_ttl_seconds")]
    pub jwks_cache_ttl_seconds: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

impl Default for McpAuthConfig {
    fn default() -> Self {
        Self {
            auth_provider: default_auth_provider(),
            jwt_algorithm: default_jwt_algorithm(),
            jwt_secret: None,
            access_token_exp_minutes: default_access_token_exp_minutes(),
            local_user_file: None,
            admin_username: None,
            admin_password: None,
            admin_static_token: None,
            cognito_user_pool_id: None,
            cognito_app_client_id: None,
            cognito_app_secret: None,
            cognito_jwks_url: None,
            jwks_cache_ttl_seconds: default_jwks_cache_ttl_seconds(),
            region: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct McpBlobConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blob_credentials: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub funct_bucket_name: Option<String>,
    #[serde(default = "default_funct_zip_path")]
    pub funct_zip_path: String,
    #[serde(default = "default_funct_extract_path")]
    pub funct_extract_path: String,
}

impl Default for McpBlobConfig {
    fn default() -> Self {
        Self {
            blob_credentials: None,
            funct_bucket_name: None,
            funct_zip_path: default_funct_zip_path(),
            funct_extract_path: default_funct_extract_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct McpRateLimitConfig {
    #[serde(default = "default_global_post_per_minute")]
    pub global_post_per_minute: u32,
    #[serde(default = "default_sse_get_per_minute")]
    pub sse_get_per_minute: u32,
}

impl Default for McpRateLimitConfig {
    fn default() -> Self {
        Self {
            global_post_per_minute: default_global_post_per_minute(),
            sse_get_per_minute: default_sse_get_per_minute(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct McpSseConfig {
    #[serde(default = "default_max_queue_size")]
    pub max_queue_size: usize,
    #[serde(default = "default_max_history")]
    pub max_history: usize,
    #[serde(
        with = "crate::domains::utils::serde_duration",
        default = "default_heartbeat_interval"
    )]
    pub heartbeat_interval: std::time::Duration,
}

impl Default for McpSseConfig {
    fn default() -> Self {
        Self {
            max_queue_size: default_max_queue_size(),
            max_history: default_max_history(),
            heartbeat_interval: default_heartbeat_interval(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct McpCacheConfig {
    #[serde(default = "default_cascade_depth")]
    pub cascade_depth: u32,
}

impl Default for McpCacheConfig {
    fn default() -> Self {
        Self {
            cascade_depth: default_cascade_depth(),
        }
    }
}

impl Default for McpConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            transport: default_mcp_transport(),
            host: default_mcp_host(),
            port: default_mcp_port(),
            config_store_url: default_config_store_url(),
            mcp_configuration: None,
            auth: McpAuthConfig::default(),
            blob: McpBlobConfig::default(),
            rate_limit: McpRateLimitConfig::default(),
            sse: McpSseConfig::default(),
            cache: McpCacheConfig::default(),
        }
    }
}

impl Validatable for McpConfig {
    fn validate(&self) -> ConfigResult<()> {
        let valid_transports = ["stdio", "sse"];
        crate::validation::validate_enum_choice(&self.transport, &valid_transports, "transport", self.domain_name())?;

        if self.transport == "sse" {
            crate::validation::validate_port_range(self.port, "port", self.domain_name())?;
        }

        let valid_providers = ["local", "cognito", "api_gateway"];
        crate::validation::validate_enum_choice(
            &self.auth.auth_provider,
            &valid_providers,
            "auth.auth_provider",
            self.domain_name(),
        )?;

        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "mcp"
    }
}

fn default_mcp_transport() -> String {
    "sse".to_string()
}

fn default_mcp_host() -> String {
    "127.0.0.1".to_string()
}

fn default_mcp_port() -> u16 {
    3001
}

fn default_config_store_url() -> String {
    "http://localhost:8080/api/v1/mcp_core_graphql".to_string()
}

fn default_auth_provider() -> String {
    "local".to_string()
}

fn default_jwt_algorithm() -> String {
    "HS256".to_string()
}

fn default_access_token_exp_minutes() -> u64 {
    60
}

fn default_jwks_cache_ttl_seconds() -> u64 {
    3600
}

fn default_funct_zip_path() -> String {
    "./data/mcp_functions/zip".to_string()
}

fn default_funct_extract_path() -> String {
    "./data/mcp_functions/extracted".to_string()
}

fn default_global_post_per_minute() -> u32 {
    100
}

fn default_sse_get_per_minute() -> u32 {
    50
}

fn default_max_queue_size() -> usize {
    100
}

fn default_max_history() -> usize {
    1000
}

fn default_heartbeat_interval() -> std::time::Duration {
    std::time::Duration::from_secs(15)
}

fn default_cascade_depth() -> u32 {
    3
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mcp_config_defaults() {
        let config = McpConfig::default();
        assert!(!config.enabled);
        assert_eq!(config.transport, "sse");
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 3001);
        assert_eq!(config.rate_limit.global_post_per_minute, 100);
        assert_eq!(config.sse.max_history, 1000);
        assert_eq!(config.cache.cascade_depth, 3);
    }

    #[test]
    fn test_mcp_config_validation() {
        let mut config = McpConfig::default();
        assert!(config.validate().is_ok());

        config.transport = "invalid".to_string();
        assert!(config.validate().is_err());

        config.transport = "sse".to_string();
        config.auth.auth_provider = "bogus".to_string();
        assert!(config.validate().is_err());
    }
}
