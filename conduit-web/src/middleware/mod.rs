pub mod auth;
pub mod cors;
pub mod error_handler;
pub mod rate_limit;
pub mod request_id;

pub use auth::{auth_middleware, AuthClaims, JwtManager};
pub use cors::cors_layer;
pub use error_handler::{error_handler_layer, handle_error, handle_not_found, internal_error};
pub use rate_limit::{
    global_rate_limit_middleware, sse_rate_limit_middleware, GlobalRateLimiter, RateLimitConfig,
    RateLimiter, SseRateLimiter,
};
pub use request_id::{request_id_layer, RequestId, RequestIdExt, REQUEST_ID_HEADER};
