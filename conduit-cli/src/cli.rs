//! CLI argument parsing definitions (§6 operator surface).

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "conduit", author, version, about = "Multi-tenant MCP daemon", long_about = None)]
pub struct Cli {
    /// Path to configuration file (YAML)
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Override the configured log level (trace, debug, info, warn, error)
    #[arg(long, value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the MCP daemon (dispatch engine, SSE fanout, JSON-RPC surface)
    Serve,

    /// Configuration file management
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Validate a configuration file against every domain's rules
    Validate {
        /// Path to the configuration file
        #[arg(long, value_name = "PATH")]
        config_file: PathBuf,
    },

    /// Print the effective configuration (defaults merged with file and
    /// environment overrides)
    Show {
        /// Output format: yaml, json
        #[arg(long, value_name = "FORMAT", default_value = "yaml")]
        format: String,
    },

    /// Generate a sample configuration file
    Generate {
        /// Output file path
        #[arg(long, value_name = "PATH")]
        output: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Bulk-load a partition's tools/resources/prompts/modules/settings
    /// from a JSON document into the upstream config store (§4.H
    /// supplement), then refresh that partition's materialised cache
    Load {
        /// Partition's endpoint_id (no `#part_id`; targets the whole endpoint)
        #[arg(long, value_name = "ENDPOINT")]
        endpoint: String,

        /// Path to a JSON `McpConfigurationDocument`
        #[arg(long, value_name = "PATH")]
        from_file: PathBuf,

        /// Attributed to the resulting records' `updated_by` field
        #[arg(long, value_name = "NAME", default_value = "conduit-cli")]
        updated_by: String,
    },
}
