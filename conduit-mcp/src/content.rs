//! MCP wire content types.
//!
//! `ToolContent`, `Tool`, and `ToolsListResult` cover the three content
//! kinds the dispatch engine classifies a handler's return value into,
//! each carrying the literal `_meta: {}` placeholder the protocol expects.

use conduit_core::types::{McpFunction, ModuleLink};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolContent {
    Text {
        text: String,
        #[serde(rename = "_meta", default)]
        meta: Map<String, Value>,
    },
    Image {
        data: String,
        #[serde(rename = "mimeType")]
        mime_type: String,
        #[serde(rename = "_meta", default)]
        meta: Map<String, Value>,
    },
    EmbeddedResource {
        resource: EmbeddedResourceBody,
        #[serde(rename = "_meta", default)]
        meta: Map<String, Value>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddedResourceBody {
    pub uri: String,
    #[serde(rename = "mimeType")]
    pub mime_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl ToolContent {
    pub fn text(text: impl Into<String>) -> Self {
        ToolContent::Text {
            text: text.into(),
            meta: Map::new(),
        }
    }

    /// Classifies a handler's raw return value into MCP content per the
    /// function's declared `return_type` (§3, §4.F step 6). `text` is the
    /// only return type the original upstream handlers actually produce;
    /// `image`/`embedded_resource` classify a handler that already returns
    /// the matching shape (`{data, mimeType}` / `{uri, mimeType, text?}`).
    pub fn classify(return_type: conduit_core::types::ReturnType, raw: &Value) -> Self {
        use conduit_core::types::ReturnType;
        match return_type {
            ReturnType::Text => ToolContent::text(raw_to_text(raw)),
            ReturnType::Image => {
                let (data, mime_type) = match raw {
                    // A bare string result is treated as base64 PNG data
                    // (§4.F step 6) rather than a `{data, mimeType}` map.
                    Value::String(s) => (s.clone(), "image/png".to_string()),
                    _ => (
                        raw.get("data").and_then(Value::as_str).unwrap_or_default().to_string(),
                        raw.get("mimeType")
                            .and_then(Value::as_str)
                            .unwrap_or("application/octet-stream")
                            .to_string(),
                    ),
                };
                ToolContent::Image {
                    data,
                    mime_type,
                    meta: Map::new(),
                }
            }
            ReturnType::EmbeddedResource => {
                let uri = raw.get("uri").and_then(Value::as_str).unwrap_or_default().to_string();
                let mime_type = raw
                    .get("mimeType")
                    .and_then(Value::as_str)
                    .unwrap_or("application/json")
                    .to_string();
                let text = raw.get("text").map(|t| raw_to_text(t));
                ToolContent::EmbeddedResource {
                    resource: EmbeddedResourceBody { uri, mime_type, text },
                    meta: Map::new(),
                }
            }
        }
    }

    /// Builds the "call is still running / failed" embedded resource the
    /// async dispatcher (§4.G) returns in place of a result.
    pub fn pending_call(call_uuid: &str, status: &str, notes: Option<&str>) -> Self {
        let mut body = serde_json::json!({"uuid": call_uuid, "status": status});
        if let Some(n) = notes {
            body["notes"] = Value::String(n.to_string());
        }
        ToolContent::EmbeddedResource {
            resource: EmbeddedResourceBody {
                uri: format!("mcp://function-call/{call_uuid}"),
                mime_type: "application/json".to_string(),
                text: Some(body.to_string()),
            },
            meta: Map::new(),
        }
    }
}

fn raw_to_text(raw: &Value) -> String {
    match raw {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conduit_core::types::ReturnType;

    #[test]
    fn image_classifies_a_data_mime_map() {
        let raw = serde_json::json!({"data": "Zm9v", "mimeType": "image/jpeg"});
        match ToolContent::classify(ReturnType::Image, &raw) {
            ToolContent::Image { data, mime_type, .. } => {
                assert_eq!(data, "Zm9v");
                assert_eq!(mime_type, "image/jpeg");
            }
            other => panic!("expected image content, got {other:?}"),
        }
    }

    #[test]
    fn image_treats_a_bare_string_as_base64_png() {
        let raw = Value::String("Zm9v".to_string());
        match ToolContent::classify(ReturnType::Image, &raw) {
            ToolContent::Image { data, mime_type, .. } => {
                assert_eq!(data, "Zm9v");
                assert_eq!(mime_type, "image/png");
            }
            other => panic!("expected image content, got {other:?}"),
        }
    }
}

/// `tools/list`, `resources/list`, `prompts/list` entry — the function's
/// identity plus its type-specific `data` flattened in (§3 materialised
/// configuration shape).
#[derive(Debug, Clone, Serialize)]
pub struct ListedFunction {
    pub name: String,
    pub description: String,
    #[serde(skip_serializing_if = "Value::is_null")]
    pub annotations: Value,
    #[serde(flatten)]
    pub data: Value,
}

impl From<&McpFunction> for ListedFunction {
    fn from(f: &McpFunction) -> Self {
        ListedFunction {
            name: f.name.clone(),
            description: f.description.clone(),
            annotations: f.annotations.clone(),
            data: f.data.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolsListResult {
    pub tools: Vec<ListedFunction>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResourcesListResult {
    pub resources: Vec<ListedFunction>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PromptsListResult {
    pub prompts: Vec<ListedFunction>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolsCallResult {
    pub content: Vec<ToolContent>,
    #[serde(rename = "isError")]
    pub is_error: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResourceContentEntry {
    pub uri: String,
    #[serde(rename = "mimeType")]
    pub mime_type: String,
    pub text: String,
    #[serde(rename = "_meta")]
    pub meta: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReadResourceResult {
    pub contents: Vec<ResourceContentEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PromptMessage {
    pub role: String,
    pub content: PromptMessageContent,
}

#[derive(Debug, Clone, Serialize)]
pub struct PromptMessageContent {
    #[serde(rename = "type")]
    pub kind: String,
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct GetPromptResult {
    pub description: String,
    pub messages: Vec<PromptMessage>,
}

/// Resolves `(module_name, class_name, function_name)` for a function by
/// name within a given `mcp_type`'s link set (§4.F step 4).
pub fn find_link<'a>(links: &'a [ModuleLink], mcp_type: conduit_core::types::McpType, name: &str) -> Option<&'a ModuleLink> {
    links.iter().find(|l| l.mcp_type == mcp_type && l.name == name)
}
