//! # Conduit MCP
//!
//! The multi-tenant Model Context Protocol daemon engine: partition key
//! assembly, the upstream config store client, the per-partition
//! materialised configuration cache, the tool/resource/prompt dispatch
//! engine (synchronous and async), SSE fanout, and JSON-RPC request
//! routing.
//!
//! HTTP transport, authentication, and rate limiting are deliberately out
//! of scope here — those live in `conduit-web` and `conduit-server`,
//! which embed [`Server`] behind their own route handlers.

pub mod async_dispatch;
pub mod cache;
pub mod config_store;
pub mod content;
pub mod dispatch;
pub mod error;
pub mod partition;
pub mod rpc;
pub mod sse;

pub use async_dispatch::AsyncDispatcher;
pub use cache::ConfigCache;
pub use config_store::{ConfigStoreClient, GraphQlConfigStoreClient, LoadStats};
pub use dispatch::DispatchEngine;
pub use error::{ConduitError, Result};
pub use rpc::McpRequestProcessor;
pub use sse::{SharedSseManager, SseManager, SseMessage, SseStats};

use std::sync::Arc;

use conduit_interfaces::blob::BlobStore;
use conduit_interfaces::metadata::MetadataStore;
use conduit_interfaces::registry::ModuleLoader;
use conduit_resilience::shutdown::ShutdownCoordinator;

/// Owns every process-wide piece of daemon state for one running
/// instance (§9): the config cache, dispatch engine, async dispatcher,
/// SSE manager, and the JSON-RPC processor built on top of them. A
/// `conduit-server`/`conduit-web` binary constructs one of these at
/// startup per configured MCP listener.
pub struct Server {
    pub cache: Arc<ConfigCache>,
    pub engine: Arc<DispatchEngine>,
    pub async_dispatcher: Arc<AsyncDispatcher>,
    pub sse: Arc<SseManager>,
    pub processor: Arc<McpRequestProcessor>,
    pub shutdown: Arc<ShutdownCoordinator>,
}

impl Server {
    pub fn new(
        store: Arc<dyn ConfigStoreClient>,
        metadata: Arc<dyn MetadataStore>,
        blobs: Arc<dyn BlobStore>,
        loader: Arc<dyn ModuleLoader>,
        cascade_depth: u32,
        sse_queue_size: usize,
        sse_history_size: usize,
    ) -> Self {
        let cache = Arc::new(ConfigCache::new(store, cascade_depth));
        let engine = Arc::new(DispatchEngine::new(metadata, blobs, cache.clone(), loader));
        let shutdown = Arc::new(ShutdownCoordinator::new());
        let async_dispatcher = Arc::new(AsyncDispatcher::new(engine.clone(), shutdown.clone()));
        let sse = Arc::new(SseManager::new(sse_queue_size, sse_history_size));
        let processor = Arc::new(McpRequestProcessor::new(engine.clone(), async_dispatcher.clone()));

        Self {
            cache,
            engine,
            async_dispatcher,
            sse,
            processor,
            shutdown,
        }
    }

    /// Invalidates the partition's materialised configuration in response
    /// to an observed upstream mutation (§4.H), forwarded here by
    /// whichever surface proxies `/mcp_core_graphql` mutations.
    pub async fn invalidate_on_mutation(&self, partition_key: &str, mutation_name: &str) -> Result<()> {
        self.cache.invalidate_on_mutation(partition_key, mutation_name).await
    }
}
