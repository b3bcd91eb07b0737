//! JSON-RPC request processor (§4.J).
//!
//! Routes the fixed MCP method table to the dispatch engine / async
//! dispatcher and maps any propagated [`ConduitError`] to a JSON-RPC
//! error envelope via its own `json_rpc_code()`.

use std::sync::Arc;

use conduit_core::error::ConduitError;
use conduit_core::types::{JsonRpcRequest, JsonRpcResponse};
use serde_json::{json, Value};

use crate::async_dispatch::AsyncDispatcher;
use crate::dispatch::DispatchEngine;

pub struct McpRequestProcessor {
    engine: Arc<DispatchEngine>,
    async_dispatcher: Arc<AsyncDispatcher>,
}

impl McpRequestProcessor {
    pub fn new(engine: Arc<DispatchEngine>, async_dispatcher: Arc<AsyncDispatcher>) -> Self {
        Self {
            engine,
            async_dispatcher,
        }
    }

    /// Handles one JSON-RPC request for `partition_key`, always returning
    /// a response envelope — errors are carried in `error`, never
    /// propagated out, since the caller (SSE/POST transport) always needs
    /// a wire-shaped reply.
    pub async fn handle(&self, partition_key: &str, request: JsonRpcRequest) -> JsonRpcResponse {
        let id = request.id.clone();
        match self.dispatch_method(partition_key, &request).await {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(ConduitError::MethodNotFound(method)) => {
                JsonRpcResponse::error(id, -32601, format!("Method not found: {method}"), None)
            }
            Err(e) => JsonRpcResponse::error(id, e.json_rpc_code(), "Internal error".to_string(), Some(json!(e.to_string()))),
        }
    }

    async fn dispatch_method(&self, partition_key: &str, request: &JsonRpcRequest) -> conduit_core::error::Result<Value> {
        match request.method.as_str() {
            "initialize" => Ok(json!({
                "protocolVersion": "2024-11-05",
                "capabilities": {
                    "tools": {"listChanged": false},
                    "resources": {"subscribe": false, "listChanged": false},
                    "prompts": {"listChanged": false},
                },
                "serverInfo": {"name": "conduit-mcp", "version": env!("CARGO_PKG_VERSION")},
            })),

            "tools/list" => {
                let result = self.engine.list_tools(partition_key).await?;
                Ok(serde_json::to_value(result)?)
            }

            "tools/call" => {
                let name = request
                    .params
                    .get("name")
                    .and_then(Value::as_str)
                    .ok_or_else(|| ConduitError::MissingArgument("name".to_string()))?;
                let arguments = request.params.get("arguments").cloned().unwrap_or(Value::Null);
                let existing_call_uuid = request.params.get("mcp_function_call_uuid").and_then(Value::as_str);

                if self.engine.is_async_tool(partition_key, name).await? {
                    let raw = self
                        .async_dispatcher
                        .dispatch(partition_key, name, arguments, existing_call_uuid)
                        .await?;
                    let content: crate::content::ToolContent = serde_json::from_value(raw)?;
                    Ok(serde_json::to_value(crate::content::ToolsCallResult {
                        content: vec![content],
                        is_error: false,
                    })?)
                } else {
                    let result = self.engine.call_tool(partition_key, name, arguments, None).await?;
                    Ok(serde_json::to_value(result)?)
                }
            }

            "resources/list" => {
                let result = self.engine.list_resources(partition_key).await?;
                Ok(serde_json::to_value(result)?)
            }

            "resources/templates/list" => Ok(json!({"resourceTemplates": []})),

            "resources/read" => {
                let uri = request
                    .params
                    .get("uri")
                    .and_then(Value::as_str)
                    .ok_or_else(|| ConduitError::MissingArgument("uri".to_string()))?;
                let result = self.engine.read_resource(partition_key, uri).await?;
                Ok(serde_json::to_value(result)?)
            }

            "prompts/list" => {
                let result = self.engine.list_prompts(partition_key).await?;
                Ok(serde_json::to_value(result)?)
            }

            "prompts/get" => {
                let name = request
                    .params
                    .get("name")
                    .and_then(Value::as_str)
                    .ok_or_else(|| ConduitError::MissingArgument("name".to_string()))?;
                let arguments = request.params.get("arguments").cloned().unwrap_or(Value::Null);
                let result = self.engine.get_prompt(partition_key, name, arguments).await?;
                Ok(serde_json::to_value(result)?)
            }

            other => Err(ConduitError::MethodNotFound(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_method_maps_to_method_not_found_code() {
        let err = ConduitError::MethodNotFound("bogus".to_string());
        assert_eq!(err.json_rpc_code(), -32601);
    }

    #[test]
    fn other_errors_map_to_internal_code() {
        let err = ConduitError::UnknownTool("bogus".to_string());
        assert_eq!(err.json_rpc_code(), -32603);
    }
}
