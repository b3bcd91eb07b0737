//! Dispatch engine (§4.F) and the `run_recorded` execute-decorator
//! replacement (§4.E, §9).

use std::sync::Arc;
use std::time::Instant;

use conduit_core::error::{ConduitError, Result};
use conduit_core::types::{CallFilter, CallStatus, CallUpdate, McpFunctionCall, McpType};
use conduit_core::validation::validate_and_fill_defaults;
use conduit_interfaces::blob::BlobStore;
use conduit_interfaces::metadata::MetadataStore;
use conduit_interfaces::registry::{Handler, ModuleLoader};
use serde_json::Value;
use tracing::error;
use uuid::Uuid;

use crate::cache::ConfigCache;
use crate::content::{find_link, GetPromptResult, ListedFunction, PromptMessage, PromptMessageContent, ReadResourceResult, ResourceContentEntry, ToolContent, ToolsCallResult, ToolsListResult, ResourcesListResult, PromptsListResult};

/// A per-item content budget above which call-record content is
/// offloaded to the blob store (§4.E).
pub const INLINE_CONTENT_BUDGET_BYTES: usize = 32 * 1024;

pub struct DispatchEngine {
    pub metadata: Arc<dyn MetadataStore>,
    pub blobs: Arc<dyn BlobStore>,
    pub cache: Arc<ConfigCache>,
    pub loader: Arc<dyn ModuleLoader>,
}

impl DispatchEngine {
    pub fn new(
        metadata: Arc<dyn MetadataStore>,
        blobs: Arc<dyn BlobStore>,
        cache: Arc<ConfigCache>,
        loader: Arc<dyn ModuleLoader>,
    ) -> Self {
        Self {
            metadata,
            blobs,
            cache,
            loader,
        }
    }

    /// Fetches the partition's materialised configuration, retrying once
    /// with a forced refresh on any failure (§4.F step 1).
    async fn fetch_config(&self, partition_key: &str) -> Result<Arc<conduit_core::types::MaterialisedConfig>> {
        match self.cache.fetch(partition_key, false).await {
            Ok(c) => Ok(c),
            Err(_) => self.cache.fetch(partition_key, true).await,
        }
    }

    pub async fn list_tools(&self, partition_key: &str) -> Result<ToolsListResult> {
        let config = self.fetch_config(partition_key).await?;
        Ok(ToolsListResult {
            tools: config.tools.iter().map(ListedFunction::from).collect(),
        })
    }

    pub async fn list_resources(&self, partition_key: &str) -> Result<ResourcesListResult> {
        let config = self.fetch_config(partition_key).await?;
        Ok(ResourcesListResult {
            resources: config.resources.iter().map(ListedFunction::from).collect(),
        })
    }

    pub async fn list_prompts(&self, partition_key: &str) -> Result<PromptsListResult> {
        let config = self.fetch_config(partition_key).await?;
        Ok(PromptsListResult {
            prompts: config.prompts.iter().map(ListedFunction::from).collect(),
        })
    }

    /// Whether `name` is wired to an `is_async` handler, so the request
    /// router can decide between calling `call_tool` directly and routing
    /// through the async dispatcher (§4.G) without duplicating the module
    /// link lookup.
    pub async fn is_async_tool(&self, partition_key: &str, name: &str) -> Result<bool> {
        let config = self.fetch_config(partition_key).await?;
        let link = find_link(&config.module_links, McpType::Tool, name)
            .ok_or_else(|| ConduitError::UnknownTool(name.to_string()))?;
        Ok(link.is_async)
    }

    /// `call_tool` (§4.F steps 1-7). Always executes synchronously;
    /// `call_uuid` is `Some` when the async dispatcher (§4.G) is invoking
    /// this on a background task with an already-created call record.
    pub async fn call_tool(
        &self,
        partition_key: &str,
        name: &str,
        arguments: Value,
        call_uuid: Option<&str>,
    ) -> Result<ToolsCallResult> {
        let config = self.fetch_config(partition_key).await?;

        let tool = config
            .tools
            .iter()
            .find(|t| t.name == name)
            .ok_or_else(|| ConduitError::UnknownTool(name.to_string()))?;

        let mut arguments = arguments;
        if let Some(schema) = tool.data.get("inputSchema") {
            validate_and_fill_defaults(schema, &mut arguments)?;
        }

        let link = find_link(&config.module_links, McpType::Tool, name)
            .ok_or_else(|| ConduitError::ModuleUnavailable(format!("no module link for tool {name}")))?;

        let resolved = config
            .modules
            .iter()
            .find(|m| m.module_name == link.module_name && m.class_name == link.class_name)
            .ok_or_else(|| ConduitError::ModuleUnavailable(format!("module {} not resolved", link.module_name)))?;

        let handler = self
            .loader
            .load(
                resolved.package_name.as_deref(),
                &resolved.module_name,
                &resolved.class_name,
                resolved.source.as_deref(),
                resolved.setting.clone(),
            )
            .await?;
        handler.set_partition_key(partition_key);

        // Classified inside the recorded closure so the call record holds
        // the same wire-shaped content a poller retrieves later (§4.G) —
        // the `return_type` needed to classify is only known here, not at
        // poll time.
        let return_type = link.return_type;
        let content_value = self
            .run_recorded(partition_key, name, McpType::Tool, arguments, call_uuid, |args| {
                let handler = handler.clone();
                let function_name = link.function_name.clone();
                Box::pin(async move {
                    let raw = handler.call(&function_name, args).await?;
                    let content = ToolContent::classify(return_type, &raw);
                    serde_json::to_value(content).map_err(ConduitError::Json)
                })
            })
            .await?;

        let content: ToolContent = serde_json::from_value(content_value)?;
        Ok(ToolsCallResult {
            content: vec![content],
            is_error: false,
        })
    }

    pub async fn read_resource(&self, partition_key: &str, uri: &str) -> Result<ReadResourceResult> {
        let config = self.fetch_config(partition_key).await?;

        let resource = config
            .resources
            .iter()
            .find(|r| r.data.get("uri").and_then(Value::as_str) == Some(uri))
            .ok_or_else(|| ConduitError::UnknownResource(uri.to_string()))?;

        let link = find_link(&config.module_links, McpType::Resource, &resource.name)
            .ok_or_else(|| ConduitError::ModuleUnavailable(format!("no module link for resource {}", resource.name)))?;
        let resolved = config
            .modules
            .iter()
            .find(|m| m.module_name == link.module_name && m.class_name == link.class_name)
            .ok_or_else(|| ConduitError::ModuleUnavailable(format!("module {} not resolved", link.module_name)))?;

        let handler = self
            .loader
            .load(
                resolved.package_name.as_deref(),
                &resolved.module_name,
                &resolved.class_name,
                resolved.source.as_deref(),
                resolved.setting.clone(),
            )
            .await?;
        handler.set_partition_key(partition_key);

        let raw = handler.call(&link.function_name, Value::String(uri.to_string())).await?;
        let text = match &raw {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };

        Ok(ReadResourceResult {
            contents: vec![ResourceContentEntry {
                uri: uri.to_string(),
                mime_type: "text/plain".to_string(),
                text,
                meta: serde_json::Map::new(),
            }],
        })
    }

    pub async fn get_prompt(&self, partition_key: &str, name: &str, arguments: Value) -> Result<GetPromptResult> {
        let config = self.fetch_config(partition_key).await?;

        let prompt = config
            .prompts
            .iter()
            .find(|p| p.name == name)
            .ok_or_else(|| ConduitError::UnknownPrompt(name.to_string()))?;

        if let Some(declared) = prompt.data.get("arguments").and_then(Value::as_array) {
            for arg in declared {
                let required = arg.get("required").and_then(Value::as_bool).unwrap_or(false);
                if !required {
                    continue;
                }
                let Some(arg_name) = arg.get("name").and_then(Value::as_str) else {
                    continue;
                };
                if arguments.get(arg_name).is_none() {
                    return Err(ConduitError::MissingArgument(arg_name.to_string()));
                }
            }
        }

        let link = find_link(&config.module_links, McpType::Prompt, name)
            .ok_or_else(|| ConduitError::ModuleUnavailable(format!("no module link for prompt {name}")))?;
        let resolved = config
            .modules
            .iter()
            .find(|m| m.module_name == link.module_name && m.class_name == link.class_name)
            .ok_or_else(|| ConduitError::ModuleUnavailable(format!("module {} not resolved", link.module_name)))?;

        let handler = self
            .loader
            .load(
                resolved.package_name.as_deref(),
                &resolved.module_name,
                &resolved.class_name,
                resolved.source.as_deref(),
                resolved.setting.clone(),
            )
            .await?;
        handler.set_partition_key(partition_key);

        let mut call_args = arguments.clone();
        if let Value::Object(ref mut map) = call_args {
            map.insert("name".to_string(), Value::String(name.to_string()));
            map.insert("partition_key".to_string(), Value::String(partition_key.to_string()));
        }
        let raw = handler.call(&link.function_name, call_args).await?;
        let text = match &raw {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };

        Ok(GetPromptResult {
            description: prompt.description.clone(),
            messages: vec![PromptMessage {
                role: "user".to_string(),
                content: PromptMessageContent {
                    kind: "text".to_string(),
                    text,
                },
            }],
        })
    }

    /// The `execute_decorator` replacement (§4.F step 6, §9): creates or
    /// loads the call record, runs `action`, and records the outcome
    /// before propagating any error. Implemented as an explicit
    /// try/finalize helper rather than a decorator since Rust has no
    /// direct equivalent.
    pub async fn run_recorded<F>(
        &self,
        partition_key: &str,
        name: &str,
        mcp_type: McpType,
        arguments: Value,
        call_uuid: Option<&str>,
        action: F,
    ) -> Result<Value>
    where
        F: FnOnce(Value) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<Value>> + Send>>,
    {
        if partition_key == "default" {
            return action(arguments).await;
        }

        let record = match call_uuid {
            Some(uuid) => self
                .metadata
                .get_call(partition_key, uuid)
                .await?
                .ok_or_else(|| ConduitError::Internal(format!("call record {uuid} not found")))?,
            None => {
                let record = McpFunctionCall {
                    call_uuid: Uuid::new_v4().to_string(),
                    name: name.to_string(),
                    mcp_type,
                    arguments: arguments.clone(),
                    status: CallStatus::Initial,
                    has_content: false,
                    content: None,
                    notes: None,
                    time_spent_ms: None,
                    updated_by: "system".to_string(),
                    created_at: chrono::Utc::now(),
                    updated_at: chrono::Utc::now(),
                };
                self.metadata.create_call(partition_key, record).await?
            }
        };

        let start = Instant::now();
        match action(arguments).await {
            Ok(raw) => {
                let time_spent_ms = start.elapsed().as_millis() as u64;
                self.record_success(partition_key, &record.call_uuid, &raw, time_spent_ms).await?;
                Ok(raw)
            }
            Err(e) => {
                error!(call_uuid = %record.call_uuid, error = %e, "handler invocation failed");
                let _ = self
                    .metadata
                    .update_call(
                        partition_key,
                        &record.call_uuid,
                        CallUpdate {
                            status: Some(CallStatus::Failed),
                            notes: Some(e.to_string()),
                            ..Default::default()
                        },
                    )
                    .await;
                Err(e)
            }
        }
    }

    async fn record_success(&self, partition_key: &str, call_uuid: &str, raw: &Value, time_spent_ms: u64) -> Result<()> {
        let serialised = raw.to_string();
        if serialised.len() > INLINE_CONTENT_BUDGET_BYTES {
            let blob_key = format!("mcp_content/{call_uuid}.json");
            self.blobs.put(&blob_key, serialised.into_bytes()).await?;
            self.metadata
                .update_call(
                    partition_key,
                    call_uuid,
                    CallUpdate {
                        status: Some(CallStatus::Completed),
                        has_content: Some(true),
                        content: None,
                        time_spent_ms: Some(time_spent_ms),
                        ..Default::default()
                    },
                )
                .await?;
        } else {
            self.metadata
                .update_call(
                    partition_key,
                    call_uuid,
                    CallUpdate {
                        status: Some(CallStatus::Completed),
                        has_content: Some(false),
                        content: Some(serialised),
                        time_spent_ms: Some(time_spent_ms),
                        ..Default::default()
                    },
                )
                .await?;
        }
        Ok(())
    }

    /// Reads a call record back, substituting blob-offloaded content when
    /// `has_content` is set (§4.E read path).
    pub async fn get_call_content(&self, partition_key: &str, call_uuid: &str) -> Result<Option<McpFunctionCall>> {
        let Some(mut record) = self.metadata.get_call(partition_key, call_uuid).await? else {
            return Ok(None);
        };
        if record.has_content {
            let blob_key = format!("mcp_content/{call_uuid}.json");
            if let Some(bytes) = self.blobs.get(&blob_key).await? {
                record.content = Some(String::from_utf8_lossy(&bytes).to_string());
            }
        }
        Ok(Some(record))
    }

    pub async fn list_calls(&self, partition_key: &str, filter: CallFilter) -> Result<Vec<McpFunctionCall>> {
        self.metadata.list_calls(partition_key, filter).await
    }
}
