//! HTTP middleware and extractors shared by the daemon's axum surfaces.
//!
//! Covers authentication (static admin token, locally-signed JWT, remote
//! Cognito-style JWKS), per-source-IP rate limiting, CORS, request IDs,
//! and the request-shape error types those concerns raise. Wire-level
//! error-to-response mapping for the MCP JSON-RPC path itself lives in
//! `conduit-error-middleware`.
//!
//! ## Example
//!
//! ```rust,no_run
//! use axum::{middleware::from_fn, Router, routing::get};
//! use conduit_web::middleware::{cors_layer, request_id_layer, auth_middleware};
//!
//! async fn me() -> &'static str {
//!     "ok"
//! }
//!
//! let app: Router = Router::new()
//!     .route("/me", get(me))
//!     .layer(from_fn(auth_middleware))
//!     .layer(request_id_layer())
//!     .layer(cors_layer());
//! ```

pub mod errors;
pub mod extractors;
pub mod middleware;

pub use errors::{WebError, WebResult};
pub use middleware::{auth_middleware, cors_layer, request_id_layer, AuthClaims, JwtManager};
