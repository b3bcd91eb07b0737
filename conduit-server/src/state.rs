//! Shared axum state: the daemon engine plus the cross-cutting
//! middleware instances every route needs access to.

use std::sync::Arc;

use conduit_config::domains::ConduitConfig;
use conduit_mcp::{ConfigStoreClient, Server as McpServer};
use conduit_web::middleware::{GlobalRateLimiter, JwtManager, SseRateLimiter};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ConduitConfig>,
    pub mcp: Arc<McpServer>,
    /// Held directly (not just through `mcp.cache`) so the
    /// `/mcp_core_graphql` proxy and the bulk configuration-load admin
    /// route can call it without the cache's build-lock machinery in the
    /// way.
    pub store: Arc<dyn ConfigStoreClient>,
    pub jwt_manager: Arc<JwtManager>,
    pub global_limiter: GlobalRateLimiter,
    pub sse_limiter: SseRateLimiter,
}
