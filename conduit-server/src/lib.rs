//! Top-level composition root for the conduit MCP daemon.
//!
//! Wires `conduit-mcp::Server` (partition cache, dispatch engine, async
//! dispatcher, SSE manager, JSON-RPC processor) behind one axum `Router`
//! carrying the HTTP surface named in §6, with `conduit-web`'s auth and
//! rate-limit middleware layered on top.

pub mod handlers;
pub mod router;
pub mod state;

pub use router::Server;
pub use state::AppState;
