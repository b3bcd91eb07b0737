//! Writes log events as newline-delimited JSON to a file, with
//! optional size-based rotation.

use crate::config::RotationConfig;
use crate::event::{LogEvent, LogLevel};
use crate::logger::StructuredLogger;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

struct RotationPolicy {
    max_bytes: u64,
}

impl RotationPolicy {
    fn from_config(config: &RotationConfig) -> Self {
        Self {
            max_bytes: parse_size(&config.max_size).unwrap_or(u64::MAX),
        }
    }
}

fn parse_size(s: &str) -> Option<u64> {
    let s = s.trim();
    let split_at = s.find(|c: char| c.is_alphabetic()).unwrap_or(s.len());
    let (num, unit) = s.split_at(split_at);
    let num: f64 = num.trim().parse().ok()?;
    let multiplier = match unit.trim().to_uppercase().as_str() {
        "" | "B" => 1.0,
        "KB" => 1024.0,
        "MB" => 1024.0 * 1024.0,
        "GB" => 1024.0 * 1024.0 * 1024.0,
        _ => return None,
    };
    Some((num * multiplier) as u64)
}

pub struct FileSink {
    path: PathBuf,
    min_level: LogLevel,
    rotation: Option<RotationPolicy>,
    file: Mutex<File>,
}

impl FileSink {
    pub fn new(
        path: PathBuf,
        min_level: LogLevel,
        rotation: Option<RotationConfig>,
    ) -> std::io::Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        Ok(Self {
            path,
            min_level,
            rotation: rotation.as_ref().map(RotationPolicy::from_config),
            file: Mutex::new(file),
        })
    }

    fn rotate_if_needed(&self, file: &mut File) {
        let Some(policy) = &self.rotation else {
            return;
        };
        let Ok(metadata) = file.metadata() else {
            return;
        };
        if metadata.len() < policy.max_bytes {
            return;
        }
        let rotated = self.path.with_extension("log.1");
        let _ = std::fs::rename(&self.path, &rotated);
        if let Ok(new_file) = OpenOptions::new().create(true).append(true).open(&self.path) {
            *file = new_file;
        }
    }
}

impl StructuredLogger for FileSink {
    fn log(&self, event: LogEvent) {
        if event.level < self.min_level {
            return;
        }
        let Ok(line) = serde_json::to_string(&event) else {
            return;
        };
        let Ok(mut file) = self.file.lock() else {
            return;
        };
        self.rotate_if_needed(&mut file);
        let _ = writeln!(file, "{line}");
    }

    fn min_level(&self) -> LogLevel {
        self.min_level
    }
}
