//! Shared error taxonomy.
//!
//! Every crate-level error enum in this workspace converts into
//! [`ConduitError`] at its outer boundary (JSON-RPC dispatch, HTTP
//! middleware) so the mapping to wire-level codes lives in one place
//! (`conduit-error-middleware`).

use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ConduitError>;

#[derive(Debug, Error)]
pub enum ConduitError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Missing required argument: {0}")]
    MissingArgument(String),

    #[error("unauthenticated")]
    Unauthenticated,

    #[error("rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("unknown resource: {0}")]
    UnknownResource(String),

    #[error("unknown prompt: {0}")]
    UnknownPrompt(String),

    #[error("handler construction failed: {0}")]
    HandlerConstructionFailed(String),

    #[error("module unavailable: {0}")]
    ModuleUnavailable(String),

    #[error("upstream failure: {0}")]
    UpstreamFailure(String),

    #[error("upstream returned semantic error: {0}")]
    UpstreamSemanticError(String),

    #[error("item too large ({size} bytes), offloaded to blob store")]
    ItemTooLarge { size: usize },

    #[error("method not found: {0}")]
    MethodNotFound(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ConduitError {
    /// Whether the caller should retry the operation without changing its
    /// input (transient failure).
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ConduitError::UpstreamFailure(_) | ConduitError::RateLimited { .. }
        )
    }

    pub fn retry_delay(&self) -> Option<Duration> {
        match self {
            ConduitError::RateLimited { retry_after_secs } => {
                Some(Duration::from_secs(*retry_after_secs))
            }
            ConduitError::UpstreamFailure(_) => Some(Duration::from_millis(250)),
            _ => None,
        }
    }

    /// JSON-RPC error code per spec §7/§6.
    pub fn json_rpc_code(&self) -> i64 {
        match self {
            ConduitError::MethodNotFound(_) => -32601,
            _ => -32603,
        }
    }

    /// HTTP status for the admin/auth surface.
    pub fn http_status(&self) -> u16 {
        match self {
            ConduitError::InvalidArgument(_) | ConduitError::MissingArgument(_) => 400,
            ConduitError::Unauthenticated => 401,
            ConduitError::RateLimited { .. } => 429,
            ConduitError::UnknownTool(_) | ConduitError::UnknownResource(_) | ConduitError::UnknownPrompt(_) => 404,
            ConduitError::UpstreamFailure(_) => 502,
            ConduitError::UpstreamSemanticError(_) => 502,
            _ => 500,
        }
    }
}
