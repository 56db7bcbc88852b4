//! Fixed-window request limits per client address.

use std::{
    net::SocketAddr,
    sync::{
        Arc,
        atomic::{AtomicU32, Ordering},
    },
    time::Duration,
};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use moka::future::Cache;
use tracing::warn;

use crate::error::ApiError;

/// Counts requests per key. Each key's window starts at its first request and
/// the entry expires with the window.
#[derive(Clone)]
pub struct RateLimiter {
    hits: Cache<String, Arc<AtomicU32>>,
    max: u32,
}

impl RateLimiter {
    pub fn new(max: u32, window: Duration) -> Self {
        Self {
            hits: Cache::builder()
                .max_capacity(100_000)
                .time_to_live(window)
                .build(),
            max,
        }
    }

    /// Records a hit and reports whether it is within the limit.
    pub async fn check(&self, key: &str) -> bool {
        let counter = self
            .hits
            .get_with(key.to_string(), async { Arc::new(AtomicU32::new(0)) })
            .await;
        counter.fetch_add(1, Ordering::Relaxed) < self.max
    }
}

/// First `x-forwarded-for` hop, else the socket peer.
pub fn client_key(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| "unknown".to_string())
}

pub async fn limit(
    State(limiter): State<RateLimiter>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let key = client_key(req.headers(), peer);

    if !limiter.check(&key).await {
        warn!(client = %key, path = %req.uri().path(), "Rate limit exceeded");
        return Err(ApiError::RateLimited);
    }
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[tokio::test]
    async fn blocks_after_max_hits_per_key() {
        let limiter = RateLimiter::new(2, Duration::from_secs(60));
        assert!(limiter.check("1.2.3.4").await);
        assert!(limiter.check("1.2.3.4").await);
        assert!(!limiter.check("1.2.3.4").await);
        assert!(limiter.check("5.6.7.8").await);
    }

    #[test]
    fn forwarded_for_wins_over_peer() {
        let peer: SocketAddr = "10.0.0.1:5555".parse().unwrap();
        let mut headers = HeaderMap::new();
        assert_eq!(client_key(&headers, Some(peer)), "10.0.0.1");
        assert_eq!(client_key(&headers, None), "unknown");

        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.7, 10.0.0.2"),
        );
        assert_eq!(client_key(&headers, Some(peer)), "203.0.113.7");
    }
}
