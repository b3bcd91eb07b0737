//! The `StructuredLogger` trait every sink implements, plus a composite
//! fan-out logger and a builder for assembling one without going
//! through [`crate::config::LoggingConfig`].

use crate::event::{LogEvent, LogLevel};
use std::sync::Arc;

/// A destination for structured log events (console, file, a buffering
/// wrapper around another logger, or a fan-out composite of several).
pub trait StructuredLogger: Send + Sync {
    fn log(&self, event: LogEvent);
    fn min_level(&self) -> LogLevel;
}

/// Fans a log event out to every configured sink, after checking it
/// against the composite's own minimum level.
pub struct CompositeLogger {
    min_level: LogLevel,
    sinks: Vec<Arc<dyn StructuredLogger>>,
}

impl CompositeLogger {
    pub fn new(min_level: LogLevel, sinks: Vec<Arc<dyn StructuredLogger>>) -> Self {
        Self { min_level, sinks }
    }
}

impl StructuredLogger for CompositeLogger {
    fn log(&self, event: LogEvent) {
        if event.level < self.min_level {
            return;
        }
        for sink in &self.sinks {
            sink.log(event.clone());
        }
    }

    fn min_level(&self) -> LogLevel {
        self.min_level
    }
}

/// Builder for assembling a [`CompositeLogger`] from sinks directly.
#[derive(Default)]
pub struct LoggerBuilder {
    min_level: LogLevel,
    sinks: Vec<Arc<dyn StructuredLogger>>,
}

impl LoggerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn min_level(mut self, level: LogLevel) -> Self {
        self.min_level = level;
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn StructuredLogger>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn build(self) -> Arc<dyn StructuredLogger> {
        Arc::new(CompositeLogger::new(self.min_level, self.sinks))
    }
}
