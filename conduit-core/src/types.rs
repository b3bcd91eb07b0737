//! Domain model: partition keys, the MCP entity model, and the JSON-RPC
//! envelope. See `DESIGN.md` for the corpus this is grounded on.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::error::ConduitError;

/// `endpoint_id` or `endpoint_id#part_id`, validated against
/// `[A-Za-z0-9_-]+` on each segment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PartitionKey {
    pub endpoint_id: String,
    pub part_id: Option<String>,
}

impl PartitionKey {
    pub fn new(endpoint_id: &str, part_id: Option<&str>) -> Result<Self, ConduitError> {
        validate_segment(endpoint_id)?;
        if let Some(p) = part_id {
            validate_segment(p)?;
        }
        Ok(Self {
            endpoint_id: endpoint_id.to_string(),
            part_id: part_id.map(|s| s.to_string()),
        })
    }

    pub fn is_default(&self) -> bool {
        self.endpoint_id == "default" && self.part_id.is_none()
    }
}

fn validate_segment(s: &str) -> Result<(), ConduitError> {
    if !s.is_empty() && s.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-') {
        Ok(())
    } else {
        Err(ConduitError::InvalidArgument(format!(
            "partition segment '{s}' must match [A-Za-z0-9_-]+"
        )))
    }
}

impl fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.part_id {
            Some(p) => write!(f, "{}#{}", self.endpoint_id, p),
            None => write!(f, "{}", self.endpoint_id),
        }
    }
}

impl FromStr for PartitionKey {
    type Err = ConduitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('#') {
            Some((e, p)) => Self::new(e, Some(p)),
            None => Self::new(s, None),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum McpType {
    Tool,
    Resource,
    Prompt,
}

impl fmt::Display for McpType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            McpType::Tool => "tool",
            McpType::Resource => "resource",
            McpType::Prompt => "prompt",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnType {
    Text,
    Image,
    EmbeddedResource,
}

impl Default for ReturnType {
    fn default() -> Self {
        ReturnType::Text
    }
}

fn default_return_type() -> ReturnType {
    ReturnType::default()
}

/// `(partition_key, name)` unique.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpFunction {
    pub name: String,
    pub mcp_type: McpType,
    pub description: String,
    /// Free-form JSON carrying `inputSchema` (tools), `uri` (resources), or
    /// `arguments` (prompts), merged into the materialised listing entry.
    pub data: Value,
    #[serde(default)]
    pub annotations: Value,
    pub module_name: Option<String>,
    pub class_name: Option<String>,
    pub function_name: Option<String>,
    #[serde(default = "default_return_type")]
    pub return_type: ReturnType,
    #[serde(default)]
    pub is_async: bool,
    pub updated_by: String,
}

/// `(partition_key, module_name)` unique.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpModule {
    pub module_name: String,
    pub package_name: Option<String>,
    pub classes: Vec<ModuleClassBinding>,
    /// Opaque source tag; if set the package is fetched from the blob store,
    /// otherwise the module must already be statically registered.
    pub source: Option<String>,
    pub updated_by: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleClassBinding {
    pub class_name: String,
    pub setting_id: String,
}

/// `(partition_key, setting_id)` unique.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpSetting {
    pub setting_id: String,
    pub setting: Value,
    pub updated_by: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallStatus {
    Initial,
    InProcess,
    Completed,
    Failed,
}

impl fmt::Display for CallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CallStatus::Initial => "initial",
            CallStatus::InProcess => "in_process",
            CallStatus::Completed => "completed",
            CallStatus::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

/// `(partition_key, call_uuid)` unique.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpFunctionCall {
    pub call_uuid: String,
    pub name: String,
    pub mcp_type: McpType,
    pub arguments: Value,
    pub status: CallStatus,
    pub has_content: bool,
    /// Inline content; only populated when `has_content == false`.
    pub content: Option<String>,
    pub notes: Option<String>,
    pub time_spent_ms: Option<u64>,
    pub updated_by: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// Filter for `MetadataStore::list_function_calls`, backed by the
/// `type-index`/`name-index` secondary indexes (§3.1).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CallFilter {
    pub mcp_type: Option<McpType>,
    pub name: Option<String>,
    pub status: Option<CallStatus>,
    pub page_number: u32,
    pub limit: u32,
}

#[derive(Debug, Clone, Default)]
pub struct CallUpdate {
    pub status: Option<CallStatus>,
    /// `Some` replaces inline content; leave unset when the result was
    /// offloaded to the blob store and `has_content` is set instead.
    pub content: Option<String>,
    pub has_content: Option<bool>,
    pub notes: Option<String>,
    pub time_spent_ms: Option<u64>,
}

/// A resolved link from a function to the module/class/function that
/// implements it, flattened for dispatch (§4.H step 4).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleLink {
    pub mcp_type: McpType,
    pub name: String,
    pub module_name: String,
    pub class_name: String,
    pub function_name: String,
    pub return_type: ReturnType,
    pub is_async: bool,
}

/// The per-partition materialised configuration cache entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MaterialisedConfig {
    pub tools: Vec<McpFunction>,
    pub resources: Vec<McpFunction>,
    pub prompts: Vec<McpFunction>,
    pub module_links: Vec<ModuleLink>,
    pub modules: Vec<ResolvedModule>,
}

/// A module with its classes' settings already resolved, ready for
/// handler construction (§4.H step 5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedModule {
    pub module_name: String,
    pub package_name: Option<String>,
    pub class_name: String,
    pub setting: Value,
    pub source: Option<String>,
}

/// A bulk configuration document, as produced by `MaterialisedConfig` and
/// consumed by `ConfigStoreClient::load_configuration` (§4.H supplement).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpConfigurationDocument {
    #[serde(default)]
    pub tools: Vec<McpFunction>,
    #[serde(default)]
    pub resources: Vec<McpFunction>,
    #[serde(default)]
    pub prompts: Vec<McpFunction>,
    #[serde(default)]
    pub module_links: Vec<ModuleLink>,
    #[serde(default)]
    pub modules: Vec<McpModule>,
    #[serde(default)]
    pub variables: Value,
}

/// Minimal JSON-RPC 2.0 envelope (§6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    pub fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: Option<Value>, code: i64, message: String, data: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(JsonRpcError { code, message, data }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partition_key_parses_endpoint_only() {
        let pk: PartitionKey = "acme-corp".parse().unwrap();
        assert_eq!(pk.endpoint_id, "acme-corp");
        assert_eq!(pk.part_id, None);
        assert_eq!(pk.to_string(), "acme-corp");
    }

    #[test]
    fn partition_key_parses_endpoint_and_part() {
        let pk: PartitionKey = "acme_corp#team_1".parse().unwrap();
        assert_eq!(pk.endpoint_id, "acme_corp");
        assert_eq!(pk.part_id.as_deref(), Some("team_1"));
        assert_eq!(pk.to_string(), "acme_corp#team_1");
    }

    #[test]
    fn partition_key_rejects_invalid_characters() {
        assert!("acme corp".parse::<PartitionKey>().is_err());
        assert!("acme#team/1".parse::<PartitionKey>().is_err());
        assert!("".parse::<PartitionKey>().is_err());
    }

    #[test]
    fn default_partition_detected() {
        let pk: PartitionKey = "default".parse().unwrap();
        assert!(pk.is_default());
        let pk2: PartitionKey = "default#x".parse().unwrap();
        assert!(!pk2.is_default());
    }
}
