//! Writes log events to stdout, as plain colorized text or one JSON
//! object per line.

use crate::event::{LogEvent, LogLevel};
use crate::logger::StructuredLogger;
use colored::Colorize;

pub struct ConsoleSink {
    min_level: LogLevel,
    json: bool,
}

impl ConsoleSink {
    pub fn new(min_level: LogLevel, json: bool) -> Self {
        Self { min_level, json }
    }

    fn colorize(level: LogLevel, line: &str) -> String {
        match level {
            LogLevel::Error => line.red().to_string(),
            LogLevel::Warn => line.yellow().to_string(),
            LogLevel::Debug | LogLevel::Trace => line.dimmed().to_string(),
            LogLevel::Info => line.to_string(),
        }
    }
}

impl StructuredLogger for ConsoleSink {
    fn log(&self, event: LogEvent) {
        if event.level < self.min_level {
            return;
        }

        if self.json {
            if let Ok(line) = serde_json::to_string(&event) {
                println!("{line}");
            }
            return;
        }

        let line = format!(
            "{} [{}] {}",
            event.timestamp.to_rfc3339(),
            event.level,
            event.message
        );
        println!("{}", Self::colorize(event.level, &line));
    }

    fn min_level(&self) -> LogLevel {
        self.min_level
    }
}
