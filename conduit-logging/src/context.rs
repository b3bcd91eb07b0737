//! Per-task logging context threaded through log events and the
//! `log_error!`/`log_event!` macros.

use serde_json::Value as JsonValue;
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct LogContext {
    pub trace_id: String,
    pub span_id: Option<String>,
    pub fields: HashMap<String, JsonValue>,
}

impl LogContext {
    pub fn new() -> Self {
        Self {
            trace_id: Uuid::new_v4().to_string(),
            span_id: None,
            fields: HashMap::new(),
        }
    }

    /// Snapshot of the ambient context for the calling task. Equivalent
    /// to [`LogContext::new`] until this crate carries task-local
    /// context propagation.
    pub fn current() -> Self {
        Self::new()
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl serde::Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.fields.insert(key.into(), v);
        }
        self
    }

    pub fn with_span_id(mut self, span_id: impl Into<String>) -> Self {
        self.span_id = Some(span_id.into());
        self
    }
}

impl Default for LogContext {
    fn default() -> Self {
        Self::new()
    }
}
