//! Declarative logging configuration: sinks, sampling and enrichment
//! toggles, assembled into a [`StructuredLogger`] by [`LoggingConfig::build_logger`].

use crate::event::LogLevel;
use crate::logger::StructuredLogger;
use crate::sinks::{BufferedSink, ConsoleSink, FileSink};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to open log file {path}: {source}")]
    FileOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SinkConfig {
    Console {
        #[serde(default)]
        level: LogLevel,
        #[serde(default)]
        use_json: bool,
    },
    File {
        path: PathBuf,
        #[serde(default)]
        level: LogLevel,
        #[serde(default)]
        rotation: Option<RotationConfig>,
        #[serde(default)]
        buffered: Option<BufferedConfig>,
    },
}

/// Size-based rotation threshold, given as a human string like `"50MB"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RotationConfig {
    pub max_size: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BufferedConfig {
    pub size: usize,
    #[serde(with = "humantime_serde")]
    pub flush_interval: std::time::Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrichmentConfig {
    pub system_info: bool,
    pub process_info: bool,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            system_info: true,
            process_info: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    pub error_rate: f64,
    pub info_rate: f64,
    pub debug_rate: f64,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            error_rate: 1.0,
            info_rate: 1.0,
            debug_rate: 1.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: LogLevel,
    pub format: LogFormat,
    pub sinks: Vec<SinkConfig>,
    pub enrichment: EnrichmentConfig,
    pub sampling: SamplingConfig,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Text,
            sinks: vec![SinkConfig::Console {
                level: LogLevel::Info,
                use_json: false,
            }],
            enrichment: EnrichmentConfig::default(),
            sampling: SamplingConfig::default(),
        }
    }
}

impl LoggingConfig {
    /// Builds a [`crate::logger::CompositeLogger`] wiring every
    /// configured sink, at this configuration's overall minimum level.
    pub fn build_logger(&self) -> Result<Arc<dyn StructuredLogger>, ConfigError> {
        let mut sinks: Vec<Arc<dyn StructuredLogger>> = Vec::new();

        for sink in &self.sinks {
            match sink {
                SinkConfig::Console { level, use_json } => {
                    sinks.push(Arc::new(ConsoleSink::new(*level, *use_json)));
                }
                SinkConfig::File {
                    path,
                    level,
                    rotation,
                    buffered,
                } => {
                    let file_sink = FileSink::new(path.clone(), *level, rotation.clone())
                        .map_err(|source| ConfigError::FileOpen {
                            path: path.clone(),
                            source,
                        })?;
                    if let Some(buffered) = buffered {
                        sinks.push(Arc::new(BufferedSink::new(
                            Arc::new(file_sink),
                            buffered.size,
                            buffered.flush_interval,
                        )));
                    } else {
                        sinks.push(Arc::new(file_sink));
                    }
                }
            }
        }

        Ok(Arc::new(crate::logger::CompositeLogger::new(
            self.level, sinks,
        )))
    }
}
