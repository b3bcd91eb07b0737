//! Integration tests for conduit-config

use conduit_config::domains::logging::{LogFormat, LogLevel};
use conduit_config::*;
use std::time::Duration;
use temp_env::with_vars;

#[test]
fn test_default_config_validation() {
    let config = ConduitConfig::default();
    assert!(config.validate_all().is_ok());
}

#[test]
fn test_config_loader_from_env() {
    let vars = vec![
        ("CONDUIT_HTTP_TIMEOUT", Some("60")),
        ("CONDUIT_LOG_LEVEL", Some("debug")),
        ("CONDUIT_MCP_PORT", Some("9001")),
    ];

    with_vars(vars, || {
        let loader = ConfigLoader::new();
        let config = loader.from_env().unwrap();

        assert_eq!(config.http.timeout, Duration::from_secs(60));
        assert_eq!(config.logging.level, LogLevel::Debug);
        assert_eq!(config.mcp.port, 9001);
    });
}

#[test]
fn test_yaml_config_serialization() {
    let config = ConduitConfig::default();
    let yaml = serde_yaml::to_string(&config).unwrap();

    let parsed: ConduitConfig = serde_yaml::from_str(&yaml).unwrap();
    assert!(parsed.validate_all().is_ok());
}

#[test]
fn test_comprehensive_config() {
    let yaml = r#"
database:
  url: "sqlite:///tmp/test.db"
  max_connections: 20

http:
  timeout: 45
  max_redirects: 5
  user_agent: "Test Agent"
  verify_ssl: false

logging:
  level: warn
  format: json
  structured: true
  targets:
    - type: console
    - type: file
      path: "/var/log/conduit.log"
      max_size_bytes: 10485760
      max_files: 5

mcp:
  enabled: true
  transport: sse
  host: "0.0.0.0"
  port: 9090
  auth:
    auth_provider: local
  rate_limit:
    global_post_per_minute: 200
"#;

    let config: ConduitConfig = serde_yaml::from_str(yaml).unwrap();
    assert!(config.validate_all().is_ok());

    assert_eq!(config.http.timeout, Duration::from_secs(45));
    assert!(!config.http.verify_ssl);
    assert_eq!(config.logging.level, LogLevel::Warn);
    assert_eq!(config.logging.format, LogFormat::Json);
    assert_eq!(config.database.max_connections, 20);

    assert_eq!(config.mcp.host, "0.0.0.0");
    assert_eq!(config.mcp.port, 9090);
    assert_eq!(config.mcp.rate_limit.global_post_per_minute, 200);
}

#[test]
fn test_validation_errors() {
    let mut config = ConduitConfig::default();
    config.http.timeout = Duration::from_secs(0);
    assert!(config.validate_all().is_err());

    config = ConduitConfig::default();
    config.mcp.transport = "carrier-pigeon".to_string();
    assert!(config.validate_all().is_err());

    config = ConduitConfig::default();
    config.database.min_connections = 50;
    config.database.max_connections = 10;
    assert!(config.validate_all().is_err());
}

#[test]
fn test_custom_prefix_loader() {
    let vars = vec![
        ("CUSTOM_HTTP_TIMEOUT", Some("120")),
        ("CUSTOM_MCP_PORT", Some("7000")),
    ];

    with_vars(vars, || {
        let loader = ConfigLoader::with_prefix("CUSTOM");
        let config = loader.from_env().unwrap();

        assert_eq!(config.http.timeout, Duration::from_secs(120));
        assert_eq!(config.mcp.port, 7000);
    });
}

#[test]
fn test_domain_specific_validation() {
    use domains::http::HttpConfig;
    use domains::logging::LoggingConfig;
    use domains::mcp::McpConfig;
    use validation::Validatable;

    let mut mcp = McpConfig::default();
    assert!(mcp.validate().is_ok());

    mcp.auth.auth_provider = "unknown".to_string();
    assert!(mcp.validate().is_err());

    let mut http = HttpConfig::default();
    assert!(http.validate().is_ok());

    http.user_agent = String::new();
    assert!(http.validate().is_err());

    let mut logging = LoggingConfig::default();
    assert!(logging.validate().is_ok());

    logging.targets.clear();
    assert!(logging.validate().is_err());
}

#[test]
fn test_generate_sample_config() {
    let sample = ConduitConfig::generate_sample();
    assert!(!sample.is_empty());
    assert!(sample.contains("database:"));
    assert!(sample.contains("http:"));
    assert!(sample.contains("logging:"));
    assert!(sample.contains("mcp:"));

    let parsed: ConduitConfig = serde_yaml::from_str(&sample).unwrap();
    assert!(parsed.validate_all().is_ok());
}
