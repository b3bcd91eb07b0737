//! Authentication extractors for Axum

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::{errors::WebError, middleware::AuthClaims};

/// Pulls the [`AuthClaims`] attached by [`crate::middleware::auth_middleware`]
/// into a handler argument. Used by `GET /me` and any handler that needs
/// the caller's identity.
impl<S> FromRequestParts<S> for AuthClaims
where
    S: Send + Sync,
{
    type Rejection = WebError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthClaims>()
            .cloned()
            .ok_or_else(|| WebError::internal("auth claims not found; is auth_middleware enabled?"))
    }
}