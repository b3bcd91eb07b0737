//! Request logging and the single error-to-HTTP-response mapping.

use axum::{
    body::Body,
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use conduit_core::error::ConduitError;
use serde_json::json;
use std::time::Instant;
use uuid::Uuid;

/// Per-request context, stashed in extensions for handlers/loggers downstream.
#[derive(Debug, Clone)]
pub struct ErrorContext {
    pub request_id: String,
    pub path: String,
    pub method: String,
}

/// Tags every request with an id and logs completion status/latency.
///
/// Logs completion status/latency per request id; REST handlers in
/// `conduit-web` build their error bodies from [`ConduitErrorResponse`]
/// directly, so there is no response-body rewriting at this layer.
pub async fn error_handling_middleware(request: Request, next: Next) -> impl IntoResponse {
    let request_id = Uuid::new_v4().to_string();
    let path = request.uri().path().to_string();
    let method = request.method().to_string();
    let start = Instant::now();

    let context = ErrorContext {
        request_id: request_id.clone(),
        path: path.clone(),
        method: method.clone(),
    };
    let mut request = request;
    request.extensions_mut().insert(context);

    let response = next.run(request).await;

    let status = response.status();
    let duration_ms = start.elapsed().as_millis();
    if status.is_success() {
        tracing::info!(request_id = %request_id, %method, %path, status = status.as_u16(), duration_ms, "request completed");
    } else {
        tracing::warn!(request_id = %request_id, %method, %path, status = status.as_u16(), duration_ms, "request completed with error status");
    }

    response
}

/// Wraps a [`ConduitError`] so it can be returned directly from an axum
/// handler. The body shape is intentionally flat (`code`/`message`), the
/// admin/auth surface has no REST-envelope requirement beyond that.
pub struct ConduitErrorResponse(pub ConduitError);

impl From<ConduitError> for ConduitErrorResponse {
    fn from(err: ConduitError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ConduitErrorResponse {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let mut body = json!({
            "code": status.as_u16(),
            "message": sanitize_message(&self.0.to_string()),
        });
        if let ConduitError::RateLimited { retry_after_secs } = &self.0 {
            body["retry_after_secs"] = json!(retry_after_secs);
        }
        (status, axum::Json(body)).into_response()
    }
}

/// Strips lines mentioning common secret-bearing keywords before an
/// internal error message reaches a client or a log sink.
pub fn sanitize_message(message: &str) -> String {
    let scrubbed: Vec<&str> = message
        .lines()
        .filter(|line| {
            let lower = line.to_ascii_lowercase();
            !lower.contains("password") && !lower.contains("secret") && !lower.contains("token")
        })
        .collect();
    let joined = scrubbed.join(" ");
    if joined.len() > 500 {
        format!("{}...", &joined[..497])
    } else {
        joined
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redacts_secret_bearing_lines() {
        let msg = "connection failed\npassword=hunter2\nretrying";
        let sanitized = sanitize_message(msg);
        assert!(!sanitized.contains("hunter2"));
        assert!(sanitized.contains("connection failed"));
    }

    #[test]
    fn truncates_long_messages() {
        let msg = "x".repeat(1000);
        let sanitized = sanitize_message(&msg);
        assert!(sanitized.len() <= 500);
        assert!(sanitized.ends_with("..."));
    }

    #[test]
    fn maps_rate_limited_to_429_with_retry_after() {
        let response =
            ConduitErrorResponse(ConduitError::RateLimited { retry_after_secs: 30 }).into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    }
}
