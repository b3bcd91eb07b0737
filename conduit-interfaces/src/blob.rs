//! Blob store client surface.
//!
//! Used for two purposes: offloading oversized function-call content
//! (`mcp_content/{call_uuid}.json`) and fetching packaged module
//! archives (`{package_name}.zip`) for the module loader.

use async_trait::async_trait;
use conduit_core::error::Result;

#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<()>;
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;
    async fn delete(&self, key: &str) -> Result<()>;
}
