//! Renders a [`crate::event::LogEvent`] carrying an error into a report
//! shaped for handing to an LLM: summary, execution context, system
//! state, matched [`crate::patterns::ErrorPattern`]s, and suggested
//! analysis prompts.

use crate::event::LogEvent;
use crate::patterns::ErrorPatternMatcher;
use serde_json::{json, Value as JsonValue};

#[derive(Debug, Clone)]
pub struct LLMExportConfig {
    pub include_system_context: bool,
    pub include_similar_errors: bool,
    pub max_context_size: usize,
    pub related_errors_window: chrono::Duration,
    pub include_prompts: bool,
}

impl Default for LLMExportConfig {
    fn default() -> Self {
        Self {
            include_system_context: true,
            include_similar_errors: true,
            max_context_size: 4096,
            related_errors_window: chrono::Duration::hours(1),
            include_prompts: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ErrorSummary {
    pub error_type: String,
    pub error_code: String,
    pub message: String,
    pub is_retryable: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ExecutionContext {
    pub task_name: Option<String>,
    pub job_id: Option<i64>,
    pub execution_id: Option<i64>,
    pub execution_duration_ms: Option<i64>,
    pub input_data_summary: Option<JsonValue>,
}

#[derive(Debug, Clone)]
pub struct SystemState {
    pub hostname: String,
    pub memory_usage_mb: u64,
    pub cpu_usage_percent: f64,
}

#[derive(Debug, Clone)]
pub struct MatchedPatternSummary {
    pub pattern_id: String,
    pub confidence: f64,
}

#[derive(Debug, Clone)]
pub struct ReportMetadata {
    pub context_tokens_estimate: usize,
}

#[derive(Debug, Clone)]
pub struct LLMErrorReport {
    pub trace_id: Option<String>,
    pub error_summary: ErrorSummary,
    pub execution_context: ExecutionContext,
    pub system_state: Option<SystemState>,
    pub matched_patterns: Vec<MatchedPatternSummary>,
    pub suggested_prompts: Vec<String>,
    pub metadata: ReportMetadata,
}

pub struct LLMExporter {
    config: LLMExportConfig,
}

fn field_as_string(event: &LogEvent, key: &str) -> Option<String> {
    event.fields.get(key).and_then(|v| v.as_str()).map(str::to_string)
}

fn field_as_i64(event: &LogEvent, key: &str) -> Option<i64> {
    event.fields.get(key).and_then(|v| v.as_i64())
}

/// Truncates long strings and long arrays inside a field value so it
/// stays bounded in an LLM prompt. Applied per top-level field of
/// `input_data`, not to the object as a whole.
fn summarize_field(value: &JsonValue) -> JsonValue {
    match value {
        JsonValue::String(s) if s.len() > 100 => JsonValue::String(format!(
            "{}... (truncated, {} chars total)",
            &s[..100],
            s.len()
        )),
        JsonValue::Array(arr) if arr.len() > 10 => {
            let mut truncated: Vec<JsonValue> = arr.iter().take(10).cloned().collect();
            truncated.push(json!(format!("... {} more items", arr.len() - 10)));
            JsonValue::Array(truncated)
        }
        other => other.clone(),
    }
}

fn summarize_input_data(value: &JsonValue) -> JsonValue {
    match value {
        JsonValue::Object(map) => {
            JsonValue::Object(map.iter().map(|(k, v)| (k.clone(), summarize_field(v))).collect())
        }
        other => summarize_field(other),
    }
}

impl LLMExporter {
    pub fn new(config: LLMExportConfig) -> Self {
        Self { config }
    }

    pub fn export_for_analysis(&self, event: &LogEvent) -> anyhow::Result<LLMErrorReport> {
        let error = event
            .error
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("log event carries no error info"))?;

        let error_summary = ErrorSummary {
            error_type: error.error_type.clone(),
            error_code: error.error_code.clone(),
            message: error.message.clone(),
            is_retryable: error.is_retryable,
        };

        let execution_context = ExecutionContext {
            task_name: field_as_string(event, "task_name"),
            job_id: field_as_i64(event, "job_id"),
            execution_id: field_as_i64(event, "execution_id"),
            execution_duration_ms: field_as_i64(event, "duration_ms"),
            input_data_summary: event.fields.get("input_data").map(summarize_input_data),
        };

        let system_state = if self.config.include_system_context {
            match (
                event.fields.get("hostname").and_then(|v| v.as_str()),
                event.fields.get("memory_usage_mb").and_then(|v| v.as_u64()),
                event.fields.get("cpu_usage_percent").and_then(|v| v.as_f64()),
            ) {
                (Some(hostname), Some(memory_usage_mb), Some(cpu_usage_percent)) => Some(SystemState {
                    hostname: hostname.to_string(),
                    memory_usage_mb,
                    cpu_usage_percent,
                }),
                _ => None,
            }
        } else {
            None
        };

        let matcher = ErrorPatternMatcher::with_defaults();
        let matched_pattern = matcher.match_error(error);
        let matched_patterns = matched_pattern
            .map(|p| {
                vec![MatchedPatternSummary {
                    pattern_id: p.id.clone(),
                    confidence: 1.0,
                }]
            })
            .unwrap_or_default();

        let mut suggested_prompts = Vec::new();
        if self.config.include_prompts {
            match matched_pattern {
                Some(pattern) => {
                    suggested_prompts.extend(pattern.llm_prompts.iter().cloned());
                    suggested_prompts.push(format!(
                        "What caused this {} and how can it be resolved?",
                        pattern.name.to_lowercase()
                    ));
                }
                None => {
                    suggested_prompts.push(format!(
                        "What caused the {} error \"{}\" and how can it be resolved?",
                        error.error_type, error.message
                    ));
                }
            }
        }

        let rendered_len = serde_json::to_string(event).map(|s| s.len()).unwrap_or(0);
        let context_tokens_estimate = (rendered_len / 4).min(self.config.max_context_size);

        Ok(LLMErrorReport {
            trace_id: event.trace_id.clone(),
            error_summary,
            execution_context,
            system_state,
            matched_patterns,
            suggested_prompts,
            metadata: ReportMetadata {
                context_tokens_estimate,
            },
        })
    }
}

pub fn format_markdown_report(report: &LLMErrorReport) -> String {
    let mut out = String::new();

    out.push_str("# Error Analysis Report\n\n");
    if let Some(trace_id) = &report.trace_id {
        out.push_str(&format!("Trace ID: `{trace_id}`\n\n"));
    }

    out.push_str("## Error Summary\n\n");
    out.push_str(&format!("- **Type**: {}\n", report.error_summary.error_type));
    out.push_str(&format!("- **Code**: {}\n", report.error_summary.error_code));
    out.push_str(&format!("- **Message**: {}\n", report.error_summary.message));
    out.push_str(&format!("- **Retryable**: {}\n\n", report.error_summary.is_retryable));

    out.push_str("## Execution Context\n\n");
    if let Some(task_name) = &report.execution_context.task_name {
        out.push_str(&format!("- **Task**: {task_name}\n"));
    }
    if let Some(job_id) = report.execution_context.job_id {
        out.push_str(&format!("- **Job ID**: {job_id}\n"));
    }
    if let Some(duration) = report.execution_context.execution_duration_ms {
        out.push_str(&format!("- **Duration**: {duration}ms\n"));
    }
    out.push('\n');

    if let Some(system) = &report.system_state {
        out.push_str("## System State\n\n");
        out.push_str(&format!("- **Host**: {}\n", system.hostname));
        out.push_str(&format!("- **Memory**: {}MB\n", system.memory_usage_mb));
        out.push_str(&format!("- **CPU**: {:.1}%\n\n", system.cpu_usage_percent));
    }

    out.push_str("## Matched Error Patterns\n\n");
    if report.matched_patterns.is_empty() {
        out.push_str("No known pattern matched this error.\n\n");
    } else {
        for pattern in &report.matched_patterns {
            out.push_str(&format!(
                "- `{}` (confidence {:.0}%)\n",
                pattern.pattern_id,
                pattern.confidence * 100.0
            ));
        }
        out.push('\n');
    }

    out.push_str("## Suggested Analysis Questions\n\n");
    for prompt in &report.suggested_prompts {
        out.push_str(&format!("- {prompt}\n"));
    }

    out
}
