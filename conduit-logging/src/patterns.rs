//! Known error patterns, matched against an [`ErrorInfo`] to surface
//! actionable suggestions (used directly, and by [`crate::llm_export`]
//! to annotate an LLM-oriented error report).

use crate::error_info::ErrorInfo;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCategory {
    TaskExecution,
    Network,
    Authentication,
    Database,
    Configuration,
    Unknown,
}

#[derive(Debug, Clone)]
pub enum MatchingRule {
    All { rules: Vec<MatchingRule> },
    Any { rules: Vec<MatchingRule> },
    ErrorType { value: String },
    MessagePattern { pattern: String },
    FieldEquals { field: String, value: JsonValue },
}

impl MatchingRule {
    fn matches(&self, error: &ErrorInfo) -> bool {
        match self {
            MatchingRule::All { rules } => rules.iter().all(|r| r.matches(error)),
            MatchingRule::Any { rules } => rules.iter().any(|r| r.matches(error)),
            MatchingRule::ErrorType { value } => &error.error_type == value,
            MatchingRule::MessagePattern { pattern } => regex::Regex::new(pattern)
                .map(|re| re.is_match(&error.message))
                .unwrap_or(false),
            MatchingRule::FieldEquals { field, value } => {
                error.context.get(field) == Some(value)
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct ErrorPattern {
    pub id: String,
    pub name: String,
    pub description: String,
    pub category: ErrorCategory,
    pub matching_rules: Vec<MatchingRule>,
    pub suggestions: Vec<String>,
    pub preventive_measures: Vec<String>,
    pub related_documentation: Vec<String>,
    pub common_causes: Vec<String>,
    pub llm_prompts: Vec<String>,
}

impl ErrorPattern {
    pub fn matches(&self, error: &ErrorInfo) -> bool {
        self.matching_rules.iter().all(|r| r.matches(error))
    }
}

/// Matches [`ErrorInfo`] records against a set of [`ErrorPattern`]s,
/// surfacing the first one that applies.
pub struct ErrorPatternMatcher {
    patterns: Vec<ErrorPattern>,
}

impl ErrorPatternMatcher {
    pub fn new(patterns: Vec<ErrorPattern>) -> Self {
        Self { patterns }
    }

    pub fn with_defaults() -> Self {
        Self::new(default_patterns())
    }

    pub fn match_error(&self, error: &ErrorInfo) -> Option<&ErrorPattern> {
        self.patterns.iter().find(|p| p.matches(error))
    }

    pub fn get_suggestions(&self, error: &ErrorInfo) -> Vec<String> {
        self.match_error(error)
            .map(|p| p.suggestions.clone())
            .unwrap_or_default()
    }
}

fn default_patterns() -> Vec<ErrorPattern> {
    vec![
        ErrorPattern {
            id: "task_not_found".to_string(),
            name: "Task Not Found".to_string(),
            description: "A referenced task does not exist in the registry".to_string(),
            category: ErrorCategory::TaskExecution,
            matching_rules: vec![MatchingRule::ErrorType {
                value: "TaskNotFound".to_string(),
            }],
            suggestions: vec!["Run `conduit list` to see available tasks".to_string()],
            preventive_measures: vec!["Validate task names before dispatch".to_string()],
            related_documentation: vec![],
            common_causes: vec!["Typo in task name".to_string(), "Task removed".to_string()],
            llm_prompts: vec![],
        },
        ErrorPattern {
            id: "http_timeout".to_string(),
            name: "HTTP Timeout".to_string(),
            description: "An outbound HTTP request exceeded its configured timeout".to_string(),
            category: ErrorCategory::Network,
            matching_rules: vec![MatchingRule::ErrorType {
                value: "NetworkError".to_string(),
            }],
            suggestions: vec!["Increase the HTTP client timeout".to_string()],
            preventive_measures: vec!["Add retry with backoff for flaky upstreams".to_string()],
            related_documentation: vec![],
            common_causes: vec!["Slow upstream".to_string(), "Network partition".to_string()],
            llm_prompts: vec![],
        },
        ErrorPattern {
            id: "db_connection_timeout".to_string(),
            name: "Database Connection Timeout".to_string(),
            description: "The metadata store connection pool could not hand out a connection in time"
                .to_string(),
            category: ErrorCategory::Database,
            matching_rules: vec![MatchingRule::All {
                rules: vec![
                    MatchingRule::ErrorType {
                        value: "DatabaseError".to_string(),
                    },
                    MatchingRule::MessagePattern {
                        pattern: r"(?i)connection timeout".to_string(),
                    },
                ],
            }],
            suggestions: vec!["Check the database is reachable and not saturated".to_string()],
            preventive_measures: vec!["Size the connection pool for peak concurrency".to_string()],
            related_documentation: vec![],
            common_causes: vec![
                "Database under heavy load".to_string(),
                "Connection pool exhausted".to_string(),
            ],
            llm_prompts: vec![],
        },
    ]
}
