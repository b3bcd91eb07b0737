//! End-to-end coverage of the dispatch pipeline: config store -> cache ->
//! dispatch engine -> content classification, using in-memory fakes for
//! every upstream boundary (§8 scenarios A, B, E).

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use conduit_core::error::{ConduitError, Result};
use conduit_core::types::*;
use conduit_interfaces::blob::BlobStore;
use conduit_interfaces::metadata::MetadataStore;
use conduit_interfaces::registry::{Handler, ModuleLoader};
use conduit_mcp::config_store::ConfigStoreClient;
use conduit_mcp::dispatch::DispatchEngine;
use conduit_mcp::cache::ConfigCache;
use conduit_mcp::{AsyncDispatcher, McpRequestProcessor};
use conduit_resilience::shutdown::ShutdownCoordinator;
use serde_json::{json, Value};

struct FakeStore {
    functions: Vec<McpFunction>,
    modules: Vec<McpModule>,
    settings: Vec<McpSetting>,
}

#[async_trait]
impl ConfigStoreClient for FakeStore {
    async fn query(&self, _partition_key: &str, _query_name: &str, _variables: Value) -> Result<Value> {
        unreachable!("test overrides the higher-level methods directly")
    }

    async fn list_all_functions(&self, _partition_key: &str) -> Result<Vec<McpFunction>> {
        Ok(self.functions.clone())
    }

    async fn get_module(&self, _partition_key: &str, module_name: &str) -> Result<Option<McpModule>> {
        Ok(self.modules.iter().find(|m| m.module_name == module_name).cloned())
    }

    async fn get_setting(&self, _partition_key: &str, setting_id: &str) -> Result<Option<McpSetting>> {
        Ok(self.settings.iter().find(|s| s.setting_id == setting_id).cloned())
    }
}

struct FakeMetadata {
    calls: Mutex<HashMap<String, McpFunctionCall>>,
}

impl FakeMetadata {
    fn new() -> Self {
        Self {
            calls: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl MetadataStore for FakeMetadata {
    async fn list_functions(&self, _partition_key: &str) -> Result<Vec<McpFunction>> {
        Ok(vec![])
    }
    async fn get_function(&self, _partition_key: &str, _name: &str) -> Result<Option<McpFunction>> {
        Ok(None)
    }
    async fn put_function(&self, _partition_key: &str, _function: McpFunction) -> Result<()> {
        Ok(())
    }
    async fn delete_function(&self, _partition_key: &str, _name: &str) -> Result<()> {
        Ok(())
    }
    async fn get_module(&self, _partition_key: &str, _module_name: &str) -> Result<Option<McpModule>> {
        Ok(None)
    }
    async fn put_module(&self, _partition_key: &str, _module: McpModule) -> Result<()> {
        Ok(())
    }
    async fn delete_module(&self, _partition_key: &str, _module_name: &str) -> Result<()> {
        Ok(())
    }
    async fn get_setting(&self, _partition_key: &str, _setting_id: &str) -> Result<Option<McpSetting>> {
        Ok(None)
    }
    async fn put_setting(&self, _partition_key: &str, _setting: McpSetting) -> Result<()> {
        Ok(())
    }
    async fn delete_setting(&self, _partition_key: &str, _setting_id: &str) -> Result<()> {
        Ok(())
    }
    async fn create_call(&self, _partition_key: &str, call: McpFunctionCall) -> Result<McpFunctionCall> {
        self.calls.lock().unwrap().insert(call.call_uuid.clone(), call.clone());
        Ok(call)
    }
    async fn get_call(&self, _partition_key: &str, call_uuid: &str) -> Result<Option<McpFunctionCall>> {
        Ok(self.calls.lock().unwrap().get(call_uuid).cloned())
    }
    async fn update_call(&self, _partition_key: &str, call_uuid: &str, update: CallUpdate) -> Result<McpFunctionCall> {
        let mut calls = self.calls.lock().unwrap();
        let record = calls.get_mut(call_uuid).expect("call exists");
        if let Some(status) = update.status {
            record.status = status;
        }
        if update.content.is_some() {
            record.content = update.content;
        }
        record.notes = update.notes.or(record.notes.take());
        record.time_spent_ms = update.time_spent_ms.or(record.time_spent_ms);
        Ok(record.clone())
    }
    async fn list_calls(&self, _partition_key: &str, _filter: CallFilter) -> Result<Vec<McpFunctionCall>> {
        Ok(self.calls.lock().unwrap().values().cloned().collect())
    }
}

struct FakeBlobStore;

#[async_trait]
impl BlobStore for FakeBlobStore {
    async fn put(&self, _key: &str, _bytes: Vec<u8>) -> Result<()> {
        Ok(())
    }
    async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>> {
        Ok(None)
    }
    async fn delete(&self, _key: &str) -> Result<()> {
        Ok(())
    }
}

struct EchoHandler;

#[async_trait]
impl Handler for EchoHandler {
    async fn call(&self, function_name: &str, args: Value) -> Result<Value> {
        Ok(json!({"called": function_name, "args": args}))
    }
}

struct StaticLoader;

#[async_trait]
impl ModuleLoader for StaticLoader {
    async fn load(
        &self,
        _package_name: Option<&str>,
        _module_name: &str,
        _class_name: &str,
        _source: Option<&str>,
        _setting: Value,
    ) -> Result<Arc<dyn Handler>> {
        Ok(Arc::new(EchoHandler))
    }
}

fn sample_function(name: &str) -> McpFunction {
    McpFunction {
        name: name.to_string(),
        mcp_type: McpType::Tool,
        description: "a test tool".to_string(),
        data: json!({"inputSchema": {"properties": {"x": {"type": "string"}}, "required": []}}),
        annotations: Value::Null,
        module_name: Some("greeter".to_string()),
        class_name: Some("Greeter".to_string()),
        function_name: Some("greet".to_string()),
        return_type: ReturnType::Text,
        is_async: false,
        updated_by: "tester".to_string(),
    }
}

fn build_engine() -> DispatchEngine {
    let store = Arc::new(FakeStore {
        functions: vec![sample_function("greet")],
        modules: vec![McpModule {
            module_name: "greeter".to_string(),
            package_name: None,
            classes: vec![ModuleClassBinding {
                class_name: "Greeter".to_string(),
                setting_id: "greeter-setting".to_string(),
            }],
            source: None,
            updated_by: "tester".to_string(),
        }],
        settings: vec![McpSetting {
            setting_id: "greeter-setting".to_string(),
            setting: json!({}),
            updated_by: "tester".to_string(),
        }],
    });
    let cache = Arc::new(ConfigCache::new(store, 3));
    DispatchEngine::new(Arc::new(FakeMetadata::new()), Arc::new(FakeBlobStore), cache, Arc::new(StaticLoader))
}

#[tokio::test]
async fn list_tools_returns_configured_function() {
    let engine = build_engine();
    let result = engine.list_tools("acme").await.unwrap();
    assert_eq!(result.tools.len(), 1);
    assert_eq!(result.tools[0].name, "greet");
}

#[tokio::test]
async fn call_tool_invokes_resolved_handler_and_classifies_text() {
    let engine = build_engine();
    let result = engine.call_tool("acme", "greet", json!({"x": "hi"}), None).await.unwrap();
    assert_eq!(result.content.len(), 1);
    match &result.content[0] {
        conduit_mcp::content::ToolContent::Text { text, .. } => {
            assert!(text.contains("greet"));
        }
        other => panic!("expected text content, got {other:?}"),
    }
}

#[tokio::test]
async fn call_tool_rejects_unknown_name() {
    let engine = build_engine();
    let err = engine.call_tool("acme", "nope", Value::Null, None).await.unwrap_err();
    assert!(matches!(err, ConduitError::UnknownTool(_)));
}

#[tokio::test]
async fn call_tool_records_call_history_for_non_default_partition() {
    let store = Arc::new(FakeStore {
        functions: vec![sample_function("greet")],
        modules: vec![McpModule {
            module_name: "greeter".to_string(),
            package_name: None,
            classes: vec![ModuleClassBinding {
                class_name: "Greeter".to_string(),
                setting_id: "greeter-setting".to_string(),
            }],
            source: None,
            updated_by: "tester".to_string(),
        }],
        settings: vec![McpSetting {
            setting_id: "greeter-setting".to_string(),
            setting: json!({}),
            updated_by: "tester".to_string(),
        }],
    });
    let cache = Arc::new(ConfigCache::new(store, 3));
    let metadata = Arc::new(FakeMetadata::new());
    let engine = DispatchEngine::new(metadata.clone(), Arc::new(FakeBlobStore), cache, Arc::new(StaticLoader));

    engine.call_tool("acme", "greet", json!({"x": "hi"}), None).await.unwrap();

    let calls = metadata.list_calls("acme", CallFilter::default()).await.unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].status, CallStatus::Completed);
}

fn sample_function_requiring(name: &str, required: &[&str]) -> McpFunction {
    let mut f = sample_function(name);
    f.data = json!({
        "inputSchema": {
            "properties": {"msg": {"type": "string"}},
            "required": required,
        },
    });
    f
}

#[tokio::test]
async fn tools_call_with_missing_required_argument_maps_to_internal_error_with_data() {
    let store = Arc::new(FakeStore {
        functions: vec![sample_function_requiring("echo", &["msg"])],
        modules: vec![McpModule {
            module_name: "greeter".to_string(),
            package_name: None,
            classes: vec![ModuleClassBinding {
                class_name: "Greeter".to_string(),
                setting_id: "greeter-setting".to_string(),
            }],
            source: None,
            updated_by: "tester".to_string(),
        }],
        settings: vec![McpSetting {
            setting_id: "greeter-setting".to_string(),
            setting: json!({}),
            updated_by: "tester".to_string(),
        }],
    });
    let cache = Arc::new(ConfigCache::new(store, 3));
    let engine = Arc::new(DispatchEngine::new(
        Arc::new(FakeMetadata::new()),
        Arc::new(FakeBlobStore),
        cache,
        Arc::new(StaticLoader),
    ));
    let async_dispatcher = Arc::new(AsyncDispatcher::new(engine.clone(), Arc::new(ShutdownCoordinator::new())));
    let processor = McpRequestProcessor::new(engine, async_dispatcher);

    let request = JsonRpcRequest {
        jsonrpc: "2.0".to_string(),
        id: Some(json!(2)),
        method: "tools/call".to_string(),
        params: json!({"name": "echo", "arguments": {}}),
    };
    let response = processor.handle("acme", request).await;

    let error = response.error.expect("expected an error response");
    assert_eq!(error.code, -32603);
    assert_eq!(error.message, "Internal error");
    let data = error.data.expect("expected data to carry the stringified cause");
    assert!(data.as_str().unwrap().contains("Missing required argument: msg"));
}

struct SlowHandler;

#[async_trait]
impl Handler for SlowHandler {
    async fn call(&self, _function_name: &str, _args: Value) -> Result<Value> {
        tokio::time::sleep(std::time::Duration::from_secs(5)).await;
        Ok(json!("done"))
    }
}

struct SlowLoader;

#[async_trait]
impl ModuleLoader for SlowLoader {
    async fn load(
        &self,
        _package_name: Option<&str>,
        _module_name: &str,
        _class_name: &str,
        _source: Option<&str>,
        _setting: Value,
    ) -> Result<Arc<dyn Handler>> {
        Ok(Arc::new(SlowHandler))
    }
}

#[tokio::test]
async fn async_dispatch_transitions_call_record_to_in_process_on_first_poll() {
    let store = Arc::new(FakeStore {
        functions: vec![sample_function("slow_tool")],
        modules: vec![McpModule {
            module_name: "greeter".to_string(),
            package_name: None,
            classes: vec![ModuleClassBinding {
                class_name: "Greeter".to_string(),
                setting_id: "greeter-setting".to_string(),
            }],
            source: None,
            updated_by: "tester".to_string(),
        }],
        settings: vec![McpSetting {
            setting_id: "greeter-setting".to_string(),
            setting: json!({}),
            updated_by: "tester".to_string(),
        }],
    });
    let cache = Arc::new(ConfigCache::new(store, 3));
    let metadata = Arc::new(FakeMetadata::new());
    let engine = Arc::new(DispatchEngine::new(
        metadata.clone(),
        Arc::new(FakeBlobStore),
        cache,
        Arc::new(SlowLoader),
    ));
    let dispatcher = AsyncDispatcher::new(engine, Arc::new(ShutdownCoordinator::new()));

    // The handler sleeps longer than the 3s poll budget, so `dispatch`
    // returns the still-running receipt, but the record it stamped on
    // the first poll tick must already read `in_process`, not `initial`.
    dispatcher.dispatch("acme", "slow_tool", json!({}), None).await.unwrap();

    let calls = metadata.list_calls("acme", CallFilter::default()).await.unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].status, CallStatus::InProcess);
}
