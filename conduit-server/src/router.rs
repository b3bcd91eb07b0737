//! Router construction and the `Server::new(config).await?.run()`
//! composition-root entry point.

use std::path::PathBuf;
use std::sync::Arc;


use anyhow::{Context, Result};
use axum::extract::Extension;
use axum::middleware::from_fn;
use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use conduit_config::domains::ConduitConfig;
use conduit_error_middleware::error_handling_middleware;
use conduit_http::HttpManager;
use conduit_interfaces::blob::BlobStore;
use conduit_interfaces::metadata::MetadataStore;
use conduit_mcp::{ConfigStoreClient, GraphQlConfigStoreClient, Server as McpServer};
use conduit_registry::{ConduitModuleLoader, PackageLoaderConfig, StaticHandlerRegistry};
use conduit_storage::{FilesystemBlobStore, SqliteMetadataStore};
use conduit_web::middleware::{
    auth_middleware, cors_layer, global_rate_limit_middleware, request_id_layer,
    sse_rate_limit_middleware, GlobalRateLimiter, JwtManager, RateLimiter, SseRateLimiter,
};

use crate::handlers;
use crate::state::AppState;

/// Owns the assembled [`AppState`] and the configuration it was built
/// from; `run()` binds and serves, draining in-flight SSE streams and
/// background tool tasks on shutdown (§9).
pub struct Server {
    config: Arc<ConduitConfig>,
    state: AppState,
}

impl Server {
    /// Builds every collaborator named in §1/§6: the metadata store, blob
    /// store, module loader, upstream config-store client, and the
    /// `conduit_mcp::Server` engine itself, then wraps them in
    /// [`AppState`].
    pub async fn new(config: ConduitConfig) -> Result<Self> {
        let config = Arc::new(config);

        let metadata: Arc<dyn MetadataStore> = Arc::new(
            SqliteMetadataStore::connect(&config.database.url)
                .await
                .context("failed to connect metadata store")?,
        );

        let blob_root = PathBuf::from(&config.mcp.blob.funct_zip_path)
            .parent()
            .map(|p| p.join("blobstore"))
            .unwrap_or_else(|| PathBuf::from("./data/blobstore"));
        let blobs: Arc<dyn BlobStore> = Arc::new(FilesystemBlobStore::new(blob_root));

        let registry = Arc::new(StaticHandlerRegistry::new());
        let loader = Arc::new(ConduitModuleLoader::new(
            registry,
            Some(blobs.clone()),
            PackageLoaderConfig {
                zip_root: config.mcp.blob.funct_zip_path.clone().into(),
                extract_root: config.mcp.blob.funct_extract_path.clone().into(),
            },
        ));

        let http = HttpManager::new();
        let store: Arc<dyn ConfigStoreClient> = Arc::new(GraphQlConfigStoreClient::new(
            http,
            config.mcp.config_store_url.clone(),
            config.mcp.mcp_configuration.clone(),
        ));

        let mcp = Arc::new(McpServer::new(
            store.clone(),
            metadata,
            blobs,
            loader,
            config.mcp.cache.cascade_depth,
            config.mcp.sse.max_queue_size,
            config.mcp.sse.max_history,
        ));

        let jwt_manager = Arc::new(JwtManager::new(config.mcp.auth.clone()));
        let global_limiter =
            GlobalRateLimiter(Arc::new(RateLimiter::global(config.mcp.rate_limit.global_post_per_minute)));
        let sse_limiter = SseRateLimiter(Arc::new(RateLimiter::sse(config.mcp.rate_limit.sse_get_per_minute)));

        let state = AppState {
            config: config.clone(),
            mcp,
            store,
            jwt_manager,
            global_limiter,
            sse_limiter,
        };

        Ok(Self { config, state })
    }

    /// Builds the full axum [`Router`] for the HTTP surface named in §6.
    pub fn build_router(&self) -> Router {
        let admin_cache = Router::new()
            .route("/", get(handlers::cache_status).post(handlers::cache_refresh).delete(handlers::cache_clear_partition))
            .route("/status", get(handlers::cache_status))
            .route("/refresh", post(handlers::cache_refresh));

        let endpoint_routes = Router::new()
            .route("/", get(handlers::endpoint_info))
            .route("/mcp", post(handlers::mcp_rpc))
            .route("/sse", get(handlers::sse_stream).post(handlers::sse_rpc))
            .route("/mcp_core_graphql", post(handlers::mcp_core_graphql))
            .route("/admin/configuration/load", post(handlers::admin_configuration_load))
            .nest("/admin/cache", admin_cache);

        Router::new()
            .route("/auth/token", post(handlers::auth_token))
            .route("/me", get(handlers::me))
            .route("/health", get(handlers::health))
            .route("/metrics", get(handlers::metrics))
            .route("/admin/cache", delete(handlers::cache_clear_all))
            .nest("/{endpoint}", endpoint_routes)
            .layer(from_fn(sse_rate_limit_middleware))
            .layer(from_fn(global_rate_limit_middleware))
            .layer(from_fn(auth_middleware))
            .layer(Extension(self.state.jwt_manager.clone()))
            .layer(Extension(self.state.global_limiter.clone()))
            .layer(Extension(self.state.sse_limiter.clone()))
            .layer(from_fn(error_handling_middleware))
            .layer(TraceLayer::new_for_http())
            // request_id_layer() is currently an identity layer (see
            // conduit-web); kept wired here so swapping in a real
            // implementation doesn't require touching this router.
            .layer(request_id_layer())
            .layer(cors_layer())
            .with_state(self.state.clone())
    }

    /// Binds `mcp.host:mcp.port` and serves until a shutdown signal is
    /// received, then joins in-flight background tool tasks with the
    /// configured graceful-shutdown deadline (§5, §9).
    pub async fn run(self) -> Result<()> {
        let addr = format!("{}:{}", self.config.mcp.host, self.config.mcp.port);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .with_context(|| format!("failed to bind {addr}"))?;

        tracing::info!(%addr, "conduit MCP daemon listening");
        let shutdown = self.state.mcp.shutdown.clone();
        let app = self.build_router();

        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

        tracing::info!("HTTP listener closed, draining background tool tasks");
        shutdown
            .shutdown()
            .await
            .map_err(|e| anyhow::anyhow!("shutdown error: {e}"))?;

        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received, draining connections");
}
