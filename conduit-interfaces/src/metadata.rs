//! Persistent metadata store client surface.
//!
//! This is the daemon's *client* view of the upstream metadata service (a
//! GraphQL service backed by a key/value table store). The daemon never
//! implements this store; it only issues a fixed set of queries and
//! mutations, modelled here as a trait so `conduit-storage` can ship a
//! reference implementation and tests can swap in a fake.

use async_trait::async_trait;
use conduit_core::error::Result;
use conduit_core::types::{CallFilter, McpFunction, McpFunctionCall, McpModule, McpSetting};

/// CRUD + list/filter surface over the four MCP entity kinds (§3).
///
/// Every method is scoped to a single `partition_key` — a request may
/// access only entities under its own partition (§3 invariant).
#[async_trait]
pub trait MetadataStore: Send + Sync {
    async fn list_functions(&self, partition_key: &str) -> Result<Vec<McpFunction>>;
    async fn get_function(&self, partition_key: &str, name: &str) -> Result<Option<McpFunction>>;
    async fn put_function(&self, partition_key: &str, function: McpFunction) -> Result<()>;
    async fn delete_function(&self, partition_key: &str, name: &str) -> Result<()>;

    async fn get_module(&self, partition_key: &str, module_name: &str) -> Result<Option<McpModule>>;
    async fn put_module(&self, partition_key: &str, module: McpModule) -> Result<()>;
    async fn delete_module(&self, partition_key: &str, module_name: &str) -> Result<()>;

    async fn get_setting(&self, partition_key: &str, setting_id: &str) -> Result<Option<McpSetting>>;
    async fn put_setting(&self, partition_key: &str, setting: McpSetting) -> Result<()>;
    async fn delete_setting(&self, partition_key: &str, setting_id: &str) -> Result<()>;

    async fn create_call(&self, partition_key: &str, call: McpFunctionCall) -> Result<McpFunctionCall>;
    async fn get_call(&self, partition_key: &str, call_uuid: &str) -> Result<Option<McpFunctionCall>>;
    async fn update_call(
        &self,
        partition_key: &str,
        call_uuid: &str,
        update: conduit_core::types::CallUpdate,
    ) -> Result<McpFunctionCall>;
    async fn list_calls(&self, partition_key: &str, filter: CallFilter) -> Result<Vec<McpFunctionCall>>;
}
