use anyhow::{Context, Result};
use clap::Parser;
use std::fs;

use conduit_config::domains::logging::LogLevel;
use conduit_config::{ConduitConfig, ConfigLoader};

mod cli;
use cli::{Cli, Commands, ConfigCommands};

fn log_level_str(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "trace",
    }
}

fn load_config(path: Option<&std::path::Path>) -> Result<ConduitConfig> {
    let loader = ConfigLoader::new();
    loader
        .load(path)
        .map_err(|e| anyhow::anyhow!("failed to load configuration: {e}"))
}

fn init_logging(config: &ConduitConfig, override_level: Option<&str>) -> Result<()> {
    let level = override_level
        .map(|s| s.to_string())
        .unwrap_or_else(|| log_level_str(config.logging.level).to_string());
    conduit_logging::init_simple_tracing(&level)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        #[cfg(feature = "server")]
        Commands::Serve => {
            let config = load_config(cli.config.as_deref())?;
            init_logging(&config, cli.log_level.as_deref())?;

            let server = conduit_server::Server::new(config).await?;
            server.run().await
        }

        #[cfg(not(feature = "server"))]
        Commands::Serve => {
            anyhow::bail!("this build was compiled without the 'server' feature")
        }

        Commands::Config { command } => match command {
            ConfigCommands::Validate { config_file } => {
                match load_config(Some(&config_file)) {
                    Ok(_) => {
                        println!("{} is valid", config_file.display());
                        Ok(())
                    }
                    Err(e) => {
                        eprintln!("{} is invalid: {e}", config_file.display());
                        std::process::exit(1);
                    }
                }
            }

            ConfigCommands::Show { format } => {
                let config = load_config(cli.config.as_deref())?;
                let rendered = match format.as_str() {
                    "json" => serde_json::to_string_pretty(&config)
                        .context("failed to serialize configuration as JSON")?,
                    "yaml" => serde_yaml::to_string(&config)
                        .context("failed to serialize configuration as YAML")?,
                    other => anyhow::bail!("unknown format '{other}', expected 'yaml' or 'json'"),
                };
                println!("{rendered}");
                Ok(())
            }

            ConfigCommands::Generate { output, force } => {
                if output.exists() && !force {
                    anyhow::bail!(
                        "{} already exists, pass --force to overwrite",
                        output.display()
                    );
                }
                let sample = ConduitConfig::default();
                let rendered = serde_yaml::to_string(&sample)
                    .context("failed to serialize default configuration")?;
                fs::write(&output, rendered)
                    .with_context(|| format!("failed to write {}", output.display()))?;
                println!("wrote sample configuration to {}", output.display());
                Ok(())
            }

            #[cfg(feature = "server")]
            ConfigCommands::Load {
                endpoint,
                from_file,
                updated_by,
            } => {
                let config = load_config(cli.config.as_deref())?;
                init_logging(&config, cli.log_level.as_deref())?;

                let contents = fs::read_to_string(&from_file)
                    .with_context(|| format!("failed to read {}", from_file.display()))?;
                let document: conduit_core::types::McpConfigurationDocument =
                    serde_json::from_str(&contents).with_context(|| {
                        format!("{} is not a valid McpConfigurationDocument", from_file.display())
                    })?;

                let http = conduit_http::HttpManager::new();
                let store: std::sync::Arc<dyn conduit_mcp::ConfigStoreClient> =
                    std::sync::Arc::new(conduit_mcp::GraphQlConfigStoreClient::new(
                        http,
                        config.mcp.config_store_url.clone(),
                        config.mcp.mcp_configuration.clone(),
                    ));

                let stats = store
                    .load_configuration(&endpoint, document, &updated_by)
                    .await
                    .context("configuration load failed")?;

                println!("loaded configuration for endpoint '{endpoint}': {stats:?}");
                Ok(())
            }

            #[cfg(not(feature = "server"))]
            ConfigCommands::Load { .. } => {
                anyhow::bail!("this build was compiled without the 'server' feature")
            }
        },
    }
}
