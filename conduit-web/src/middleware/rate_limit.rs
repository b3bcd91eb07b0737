//! Per-source-IP token-bucket rate limiting (§5: 100 POST/min global, 50
//! GET/min on the SSE stream endpoint, sliding window).

use axum::{
    extract::{ConnectInfo, Request},
    middleware::Next,
    response::Response,
};
use lru::LruCache;
use std::net::SocketAddr;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::errors::WebError;

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub requests_per_minute: u32,
}

/// Token bucket, refilled continuously at `requests_per_minute / 60` per
/// second, capped at `requests_per_minute` tokens (one minute of burst).
#[derive(Debug, Clone)]
struct TokenBucket {
    tokens: f64,
    last_refill: Instant,
    max_tokens: f64,
    refill_rate: f64,
}

impl TokenBucket {
    fn new(requests_per_minute: u32) -> Self {
        let max_tokens = requests_per_minute as f64;
        Self {
            tokens: max_tokens,
            last_refill: Instant::now(),
            max_tokens,
            refill_rate: max_tokens / 60.0,
        }
    }

    fn try_consume(&mut self) -> bool {
        self.refill();
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    fn refill(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_rate).min(self.max_tokens);
        self.last_refill = now;
    }

    fn time_until_available(&mut self) -> Duration {
        self.refill();
        if self.tokens >= 1.0 {
            Duration::from_secs(0)
        } else {
            Duration::from_secs_f64((1.0 - self.tokens) / self.refill_rate)
        }
    }
}

/// A single named limiter keyed by source IP. The daemon runs two
/// instances — one for the global POST quota, one for the SSE GET quota —
/// rather than one limiter shared across both, since they bound unrelated
/// request classes to different rates.
pub struct RateLimiter {
    name: &'static str,
    config: RateLimitConfig,
    clients: RwLock<LruCache<std::net::IpAddr, TokenBucket>>,
}

impl RateLimiter {
    pub fn new(name: &'static str, config: RateLimitConfig) -> Self {
        Self {
            name,
            config,
            clients: RwLock::new(LruCache::new(NonZeroUsize::new(10_000).unwrap())),
        }
    }

    pub fn global(requests_per_minute: u32) -> Self {
        Self::new("global", RateLimitConfig { requests_per_minute })
    }

    pub fn sse(requests_per_minute: u32) -> Self {
        Self::new("sse", RateLimitConfig { requests_per_minute })
    }

    async fn check(&self, ip: std::net::IpAddr) -> Result<(), WebError> {
        let mut clients = self.clients.write().await;
        let bucket = clients
            .get_or_insert_mut(ip, || TokenBucket::new(self.config.requests_per_minute));

        if bucket.try_consume() {
            debug!(limiter = self.name, %ip, "rate limit check passed");
            Ok(())
        } else {
            let retry_after = bucket.time_until_available();
            warn!(limiter = self.name, %ip, ?retry_after, "rate limit exceeded");
            Err(WebError::RateLimit { retry_after_secs: retry_after.as_secs().max(1) })
        }
    }
}

fn client_ip(request: &Request) -> Option<std::net::IpAddr> {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
}

/// Wraps the global-quota limiter so it doesn't collide with
/// [`SseRateLimiter`] in request extensions (both are `Arc<RateLimiter>`
/// underneath).
#[derive(Clone)]
pub struct GlobalRateLimiter(pub Arc<RateLimiter>);

#[derive(Clone)]
pub struct SseRateLimiter(pub Arc<RateLimiter>);

/// Applied globally: 100 POST/min per source IP.
pub async fn global_rate_limit_middleware(request: Request, next: Next) -> Result<Response, WebError> {
    if request.method() != axum::http::Method::POST {
        return Ok(next.run(request).await);
    }
    let ip = client_ip(&request).ok_or_else(|| WebError::internal("client IP not available"))?;
    let limiter = request
        .extensions()
        .get::<GlobalRateLimiter>()
        .ok_or_else(|| WebError::internal("rate limiter not configured"))?
        .0
        .clone();
    limiter.check(ip).await?;
    Ok(next.run(request).await)
}

/// Applied only on `/{endpoint}/sse` GET requests: 50 GET/min per source IP.
pub async fn sse_rate_limit_middleware(request: Request, next: Next) -> Result<Response, WebError> {
    if request.method() != axum::http::Method::GET {
        return Ok(next.run(request).await);
    }
    let ip = client_ip(&request).ok_or_else(|| WebError::internal("client IP not available"))?;
    let limiter = request
        .extensions()
        .get::<SseRateLimiter>()
        .ok_or_else(|| WebError::internal("rate limiter not configured"))?
        .0
        .clone();
    limiter.check(ip).await?;
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    #[tokio::test]
    async fn allows_requests_within_quota_then_blocks() {
        let limiter = RateLimiter::global(2);
        let ip = IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1));
        assert!(limiter.check(ip).await.is_ok());
        assert!(limiter.check(ip).await.is_ok());
        assert!(limiter.check(ip).await.is_err());
    }

    #[tokio::test]
    async fn token_bucket_refills_over_time() {
        let mut bucket = TokenBucket::new(60);
        for _ in 0..60 {
            assert!(bucket.try_consume());
        }
        assert!(!bucket.try_consume());
        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert!(bucket.try_consume());
    }

    #[tokio::test]
    async fn separate_ips_tracked_independently() {
        let limiter = RateLimiter::sse(1);
        let a = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1));
        let b = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2));
        assert!(limiter.check(a).await.is_ok());
        assert!(limiter.check(a).await.is_err());
        assert!(limiter.check(b).await.is_ok());
    }
}
