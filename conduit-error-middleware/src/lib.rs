//! Wire-level error mapping shared by every HTTP surface the daemon exposes.
//!
//! `conduit_core::error::ConduitError` is the single error taxonomy; this
//! crate converts it to an HTTP response for the admin/auth surface and
//! carries the request-logging middleware those surfaces are mounted
//! behind. JSON-RPC error bodies for the MCP endpoints are built directly
//! by `conduit-mcp::rpc` from `ConduitError::json_rpc_code`, so they don't
//! route through here.

pub mod middleware;

pub use middleware::{error_handling_middleware, sanitize_message, ConduitErrorResponse, ErrorContext};
