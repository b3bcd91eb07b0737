//! Route handlers wiring the daemon engine behind the HTTP surface (§6).

use std::convert::Infallible;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use axum::extract::{Form, Path, State};
use axum::http::HeaderMap;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::Json;
use conduit_core::types::{JsonRpcRequest, JsonRpcResponse, McpConfigurationDocument};
use conduit_mcp::{cache::INVALIDATING_MUTATIONS, SseManager, SseMessage};
use futures_util::stream::{self, Stream, StreamExt};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::time::interval;
use tokio_stream::wrappers::{IntervalStream, ReceiverStream};
use tracing::warn;

use conduit_web::{AuthClaims, WebError};

use crate::state::AppState;

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

fn partition_key(endpoint: &str, headers: &HeaderMap) -> Result<String, WebError> {
    let part_id = headers.get("X-Part-Id").and_then(|v| v.to_str().ok());
    conduit_mcp::partition::assemble(endpoint, part_id)
        .map(|pk| pk.to_string())
        .map_err(WebError::from)
}

/// Embeds `id` into the JSON payload itself (not just the SSE protocol
/// `id:` field) so a client parsing only `data:` still observes the
/// monotonic ordering (§6 SSE framing).
fn to_event(message: SseMessage) -> Result<Event, Infallible> {
    let mut data = message.data;
    if let Value::Object(ref mut map) = data {
        map.insert("id".to_string(), json!(message.id));
    }
    Ok(Event::default()
        .id(message.id.to_string())
        .event(message.event)
        .data(data.to_string()))
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

/// `POST /auth/token`.
pub async fn auth_token(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> Result<Json<Value>, WebError> {
    let token = state.jwt_manager.mint_token(&form.username, &form.password).await?;
    Ok(Json(json!({"access_token": token, "token_type": "bearer"})))
}

/// `GET /me`.
pub async fn me(claims: AuthClaims) -> Json<AuthClaims> {
    Json(claims)
}

/// `GET /{endpoint}`.
pub async fn endpoint_info(
    State(state): State<AppState>,
    Path(endpoint): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Value>, WebError> {
    let pk = partition_key(&endpoint, &headers)?;
    let tools = state.mcp.engine.list_tools(&pk).await.map_err(WebError::from)?;
    let resources = state.mcp.engine.list_resources(&pk).await.map_err(WebError::from)?;
    let prompts = state.mcp.engine.list_prompts(&pk).await.map_err(WebError::from)?;
    let sse_stats = state.mcp.sse.stats(&pk).await;
    Ok(Json(json!({
        "server": "conduit-mcp",
        "version": env!("CARGO_PKG_VERSION"),
        "partition_key": pk,
        "sse_stats": sse_stats,
        "tools": tools,
        "resources": resources,
        "prompts": prompts,
    })))
}

/// `GET /health`.
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    let sse_stats = state.mcp.sse.stats("default").await;
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "sse_stats": sse_stats,
    }))
}

/// `GET /metrics`.
pub async fn metrics(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "sse_manager": state.mcp.sse.stats("default").await,
        "rate_limiting": {
            "global_post_per_minute": state.config.mcp.rate_limit.global_post_per_minute,
            "sse_get_per_minute": state.config.mcp.rate_limit.sse_get_per_minute,
        },
        "mcp_cache": {
            "cascade_depth": state.config.mcp.cache.cascade_depth,
        },
    }))
}

/// `POST /{endpoint}/mcp`.
pub async fn mcp_rpc(
    State(state): State<AppState>,
    Path(endpoint): Path<String>,
    headers: HeaderMap,
    Json(request): Json<JsonRpcRequest>,
) -> Result<Json<JsonRpcResponse>, WebError> {
    let pk = partition_key(&endpoint, &headers)?;
    Ok(Json(state.mcp.processor.handle(&pk, request).await))
}

/// `POST /{endpoint}/sse`: same JSON-RPC dispatch as `/mcp`, additionally
/// fanned out to the caller's own connected SSE clients.
pub async fn sse_rpc(
    State(state): State<AppState>,
    Path(endpoint): Path<String>,
    headers: HeaderMap,
    claims: AuthClaims,
    Json(request): Json<JsonRpcRequest>,
) -> Result<Json<JsonRpcResponse>, WebError> {
    let pk = partition_key(&endpoint, &headers)?;
    let method = request.method.clone();
    let response = state.mcp.processor.handle(&pk, request).await;
    let payload = json!({
        "type": "mcp_activity",
        "method": method,
        "response": response,
    });
    if let Err(e) = state.mcp.sse.send_to_user(&pk, &claims.username, "response", payload).await {
        warn!(error = %e, user = %claims.username, "failed to fan out SSE response");
    }
    Ok(Json(response))
}

/// Keeps the SSE client registered for the lifetime of the stream, and
/// deregisters it once the connection drops (client disconnect, server
/// shutdown) so a later broadcast doesn't have to discover the dead
/// channel on its own.
struct SseClientGuard {
    inner: Pin<Box<dyn Stream<Item = Result<Event, Infallible>> + Send>>,
    sse: Arc<SseManager>,
    partition_key: String,
    client_id: u64,
}

impl Stream for SseClientGuard {
    type Item = Result<Event, Infallible>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        this.inner.as_mut().poll_next(cx)
    }
}

impl Drop for SseClientGuard {
    fn drop(&mut self) {
        let sse = self.sse.clone();
        let partition_key = std::mem::take(&mut self.partition_key);
        let client_id = self.client_id;
        tokio::spawn(async move {
            sse.remove_client(&partition_key, client_id).await;
        });
    }
}

/// `GET /{endpoint}/sse`: registers a client, replays anything missed
/// since `Last-Event-ID`, then streams live broadcasts plus a heartbeat
/// every 15 seconds.
pub async fn sse_stream(
    State(state): State<AppState>,
    Path(endpoint): Path<String>,
    headers: HeaderMap,
    claims: AuthClaims,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, WebError> {
    let pk = partition_key(&endpoint, &headers)?;
    let last_event_id = headers
        .get("Last-Event-ID")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());

    let (client_id, rx) = state.mcp.sse.add_client(&pk, Some(&claims.username)).await;

    let connected = Event::default().event("connected").data(
        json!({"client_id": client_id, "timestamp": chrono::Utc::now().to_rfc3339()}).to_string(),
    );

    let replay = match last_event_id {
        Some(since) => state.mcp.sse.missed_since(&pk, since).await,
        None => Vec::new(),
    };
    let initial: Vec<Result<Event, Infallible>> = std::iter::once(Ok(connected))
        .chain(replay.into_iter().map(to_event))
        .collect();

    let live = ReceiverStream::new(rx).map(to_event);
    let heartbeat = IntervalStream::new(interval(HEARTBEAT_INTERVAL))
        .map(|_| Ok(Event::default().event("heartbeat").data(chrono::Utc::now().to_rfc3339())));
    let tail: Pin<Box<dyn Stream<Item = Result<Event, Infallible>> + Send>> =
        Box::pin(stream::select(live, heartbeat));

    let combined: Pin<Box<dyn Stream<Item = Result<Event, Infallible>> + Send>> =
        Box::pin(stream::iter(initial).chain(tail));

    let guarded = SseClientGuard {
        inner: combined,
        sse: state.mcp.sse.clone(),
        partition_key: pk,
        client_id,
    };

    Ok(Sse::new(guarded).keep_alive(KeepAlive::new().interval(HEARTBEAT_INTERVAL).text("keep-alive")))
}

#[derive(Debug, Deserialize)]
pub struct GraphQlProxyBody {
    pub query: String,
    #[serde(default)]
    pub variables: Value,
}

/// `POST /{endpoint}/mcp_core_graphql`: proxies a raw query/mutation to
/// the config store, then invalidates the partition's materialised
/// configuration if the query text names one of the mutations that
/// change it (§4.H).
pub async fn mcp_core_graphql(
    State(state): State<AppState>,
    Path(endpoint): Path<String>,
    headers: HeaderMap,
    Json(body): Json<GraphQlProxyBody>,
) -> Result<Json<Value>, WebError> {
    let pk = partition_key(&endpoint, &headers)?;
    let data = state
        .store
        .query(&pk, &body.query, body.variables)
        .await
        .map_err(WebError::from)?;

    for mutation in INVALIDATING_MUTATIONS {
        if body.query.contains(mutation) {
            if let Err(e) = state.mcp.invalidate_on_mutation(&pk, mutation).await {
                warn!(error = %e, mutation, "cache invalidation after mutation failed");
            }
        }
    }

    Ok(Json(json!({"data": data})))
}

/// `GET /{endpoint}/admin/cache` and `GET /{endpoint}/admin/cache/status`.
pub async fn cache_status(
    State(state): State<AppState>,
    Path(endpoint): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Value>, WebError> {
    let pk = partition_key(&endpoint, &headers)?;
    let config = state.mcp.cache.fetch(&pk, false).await.map_err(WebError::from)?;
    Ok(Json(json!({
        "partition_key": pk,
        "tools": config.tools.len(),
        "resources": config.resources.len(),
        "prompts": config.prompts.len(),
        "modules": config.modules.len(),
    })))
}

/// `POST /{endpoint}/admin/cache` and `POST /{endpoint}/admin/cache/refresh`.
pub async fn cache_refresh(
    State(state): State<AppState>,
    Path(endpoint): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Value>, WebError> {
    let pk = partition_key(&endpoint, &headers)?;
    let config = state.mcp.cache.refresh(&pk).await.map_err(WebError::from)?;
    Ok(Json(json!({
        "partition_key": pk,
        "refreshed": true,
        "tools": config.tools.len(),
        "resources": config.resources.len(),
        "prompts": config.prompts.len(),
        "modules": config.modules.len(),
    })))
}

/// `DELETE /{endpoint}/admin/cache`.
pub async fn cache_clear_partition(
    State(state): State<AppState>,
    Path(endpoint): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Value>, WebError> {
    let pk = partition_key(&endpoint, &headers)?;
    state.mcp.cache.clear(Some(&pk)).await.map_err(WebError::from)?;
    Ok(Json(json!({"partition_key": pk, "cleared": true})))
}

/// `DELETE /admin/cache`.
pub async fn cache_clear_all(State(state): State<AppState>) -> Result<Json<Value>, WebError> {
    state.mcp.cache.clear(None).await.map_err(WebError::from)?;
    Ok(Json(json!({"cleared": "all"})))
}

#[derive(Debug, Deserialize)]
pub struct LoadConfigurationBody {
    pub mcp_configuration: McpConfigurationDocument,
    pub updated_by: String,
}

/// `POST /{endpoint}/admin/configuration/load` (§4.H bulk-load supplement).
pub async fn admin_configuration_load(
    State(state): State<AppState>,
    Path(endpoint): Path<String>,
    headers: HeaderMap,
    Json(body): Json<LoadConfigurationBody>,
) -> Result<Json<Value>, WebError> {
    let pk = partition_key(&endpoint, &headers)?;
    let stats = state
        .store
        .load_configuration(&pk, body.mcp_configuration, &body.updated_by)
        .await
        .map_err(WebError::from)?;
    state.mcp.cache.refresh(&pk).await.map_err(WebError::from)?;
    Ok(Json(json!({
        "partition_key": pk,
        "tools": stats.tools,
        "resources": stats.resources,
        "prompts": stats.prompts,
        "modules": stats.modules,
        "settings": stats.settings,
    })))
}
