//! Web-specific error types and conversions
//!
//! Error types that integrate with HTTP APIs and convert to appropriate
//! responses. `conduit_core::error::ConduitError` remains the taxonomy
//! used by the MCP/dispatch core; `WebError` covers the HTTP-only
//! concerns (validation of request shape, rate limiting) that never
//! reach the JSON-RPC layer, plus a conversion from `ConduitError` for
//! handlers that call into the core and need to return an HTTP error.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use conduit_core::error::ConduitError;
use conduit_error_middleware::sanitize_message;
use serde_json::json;
use thiserror::Error;

/// Web-specific error type for HTTP API operations
#[derive(Debug, Error)]
pub enum WebError {
    #[error("Bad request: {message}")]
    BadRequest { message: String },

    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    #[error("Forbidden: {message}")]
    Forbidden { message: String },

    #[error("Not found: {message}")]
    NotFound { message: String },

    #[error("Too many requests: retry after {retry_after_secs}s")]
    RateLimit { retry_after_secs: u64 },

    #[error("Internal server error: {message}")]
    Internal { message: String },

    #[error("Validation error: {errors:?}")]
    Validation { errors: Vec<ValidationError> },
}

/// Validation error details
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ValidationError {
    pub field: Option<String>,
    pub message: String,
    pub code: String,
}

pub type WebResult<T> = Result<T, WebError>;

impl WebError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            WebError::BadRequest { .. } | WebError::Validation { .. } => StatusCode::BAD_REQUEST,
            WebError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            WebError::Forbidden { .. } => StatusCode::FORBIDDEN,
            WebError::NotFound { .. } => StatusCode::NOT_FOUND,
            WebError::RateLimit { .. } => StatusCode::TOO_MANY_REQUESTS,
            WebError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            WebError::BadRequest { .. } => "BAD_REQUEST",
            WebError::Unauthorized { .. } => "UNAUTHORIZED",
            WebError::Forbidden { .. } => "FORBIDDEN",
            WebError::NotFound { .. } => "NOT_FOUND",
            WebError::RateLimit { .. } => "RATE_LIMITED",
            WebError::Internal { .. } => "INTERNAL_ERROR",
            WebError::Validation { .. } => "VALIDATION_ERROR",
        }
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            WebError::Internal { message } => sanitize_message(message),
            other => other.to_string(),
        };

        let body = match &self {
            WebError::Validation { errors } => json!({
                "code": self.error_code(),
                "message": message,
                "details": errors,
            }),
            WebError::Unauthorized { .. } => json!({
                "code": self.error_code(),
                "message": message,
            }),
            WebError::RateLimit { retry_after_secs } => json!({
                "code": self.error_code(),
                "message": message,
                "retry_after_secs": retry_after_secs,
            }),
            _ => json!({
                "code": self.error_code(),
                "message": message,
            }),
        };

        let mut response = (status, Json(body)).into_response();
        if matches!(self, WebError::Unauthorized { .. }) {
            response
                .headers_mut()
                .insert(axum::http::header::WWW_AUTHENTICATE, "Bearer".parse().unwrap());
        }
        response
    }
}

/// Surfaces a core dispatch/cache error (e.g. from a handler that calls
/// into `conduit_mcp` directly, such as the admin cache endpoints) as an
/// HTTP response using the same status mapping the JSON-RPC path uses.
impl From<ConduitError> for WebError {
    fn from(err: ConduitError) -> Self {
        match err {
            ConduitError::Unauthenticated => WebError::Unauthorized {
                message: "authentication required".to_string(),
            },
            ConduitError::RateLimited { retry_after_secs } => {
                WebError::RateLimit { retry_after_secs }
            }
            ConduitError::InvalidArgument(msg) | ConduitError::MissingArgument(msg) => {
                WebError::BadRequest { message: msg }
            }
            ConduitError::UnknownTool(msg)
            | ConduitError::UnknownResource(msg)
            | ConduitError::UnknownPrompt(msg) => WebError::NotFound { message: msg },
            other => WebError::Internal {
                message: other.to_string(),
            },
        }
    }
}

impl WebError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        WebError::BadRequest { message: message.into() }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        WebError::Unauthorized { message: message.into() }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        WebError::Forbidden { message: message.into() }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        WebError::NotFound { message: message.into() }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        WebError::Internal { message: message.into() }
    }

    pub fn validation(errors: Vec<ValidationError>) -> Self {
        WebError::Validation { errors }
    }

    pub fn validation_single(field: Option<String>, message: String, code: String) -> Self {
        WebError::Validation {
            errors: vec![ValidationError { field, message, code }],
        }
    }
}
