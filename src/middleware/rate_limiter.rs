//! Per-client rate limiting

use axum::{
    extract::{ConnectInfo, Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::Mutex;

use crate::error::ApiError;

/// Tracked clients above which `check` sweeps idle buckets
const SWEEP_THRESHOLD: usize = 10_000;

#[derive(Debug, Clone, Copy)]
struct Bucket {
    tokens: f64,
    refreshed: Instant,
}

/// Token-bucket limiter keyed by client address
#[derive(Clone)]
pub struct RateLimiter {
    buckets: Arc<Mutex<HashMap<String, Bucket>>>,
    refill_per_second: f64,
    capacity: f64,
    trust_proxy_headers: bool,
}

impl RateLimiter {
    /// Allow `requests_per_second` sustained, with bursts of twice that
    pub fn new(requests_per_second: u32) -> Self {
        let rate = f64::from(requests_per_second.max(1));
        Self {
            buckets: Arc::new(Mutex::new(HashMap::new())),
            refill_per_second: rate,
            capacity: rate * 2.0,
            trust_proxy_headers: false,
        }
    }

    /// Key clients by `X-Forwarded-For` / `X-Real-IP` instead of the socket peer
    ///
    /// Only enable behind a proxy that overwrites these headers.
    pub fn trust_proxy_headers(mut self, trust: bool) -> Self {
        self.trust_proxy_headers = trust;
        self
    }

    /// Idle time after which a bucket has refilled completely
    pub fn refill_window(&self) -> Duration {
        Duration::from_secs_f64(self.capacity / self.refill_per_second)
    }

    /// Take one token for `client`; false when the bucket is empty
    pub async fn check(&self, client: &str) -> bool {
        let now = Instant::now();
        let mut buckets = self.buckets.lock().await;

        if buckets.len() >= SWEEP_THRESHOLD && !buckets.contains_key(client) {
            let window = self.refill_window();
            buckets.retain(|_, bucket| now.duration_since(bucket.refreshed) < window);
        }

        let bucket = buckets.entry(client.to_string()).or_insert(Bucket {
            tokens: self.capacity,
            refreshed: now,
        });

        let elapsed = now.duration_since(bucket.refreshed).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.refill_per_second).min(self.capacity);
        bucket.refreshed = now;

        if bucket.tokens < 1.0 {
            return false;
        }
        bucket.tokens -= 1.0;
        true
    }

    /// Drop buckets untouched for `max_age` (call periodically)
    pub async fn cleanup(&self, max_age: Duration) -> usize {
        let mut buckets = self.buckets.lock().await;
        let before = buckets.len();
        let now = Instant::now();

        buckets.retain(|_, bucket| now.duration_since(bucket.refreshed) < max_age);

        before - buckets.len()
    }

    /// Number of clients currently tracked
    pub async fn tracked_clients(&self) -> usize {
        self.buckets.lock().await.len()
    }

    fn client_for(&self, request: &Request) -> String {
        if self.trust_proxy_headers {
            if let Some(client) = forwarded_client(request.headers()) {
                return client;
            }
        }

        peer_address(request)
    }
}

/// IP of the connected socket peer
pub(crate) fn peer_address(request: &Request) -> String {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Middleware rejecting clients that exceed their budget
pub async fn rate_limit(
    State(limiter): State<RateLimiter>,
    request: Request,
    next: Next,
) -> Response {
    let client = limiter.client_for(&request);

    if !limiter.check(&client).await {
        tracing::warn!(client = %client, path = %request.uri().path(), "Rate limit exceeded");
        return ApiError::TooManyRequests.into_response();
    }

    next.run(request).await
}

/// Client identifier from proxy headers
fn forwarded_client(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.split(',').next())
        .or_else(|| headers.get("x-real-ip").and_then(|h| h.to_str().ok()))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::HeaderValue;

    fn request_from(peer: &str, forwarded_for: Option<&'static str>) -> Request {
        let mut request = Request::new(Body::empty());
        let addr: SocketAddr = peer.parse().unwrap();
        request.extensions_mut().insert(ConnectInfo(addr));
        if let Some(value) = forwarded_for {
            request
                .headers_mut()
                .insert("x-forwarded-for", HeaderValue::from_static(value));
        }
        request
    }

    #[tokio::test]
    async fn test_burst_then_reject() {
        let limiter = RateLimiter::new(5);

        for _ in 0..10 {
            assert!(limiter.check("client").await);
        }
        assert!(!limiter.check("client").await);
    }

    #[tokio::test]
    async fn test_clients_are_independent() {
        let limiter = RateLimiter::new(1);

        assert!(limiter.check("a").await);
        assert!(limiter.check("a").await);
        assert!(!limiter.check("a").await);
        assert!(limiter.check("b").await);
    }

    #[tokio::test]
    async fn test_cleanup_evicts_stale_buckets() {
        let limiter = RateLimiter::new(1);
        limiter.check("stale").await;
        tokio::time::sleep(Duration::from_millis(30)).await;
        limiter.check("fresh").await;

        let removed = limiter.cleanup(Duration::from_millis(20)).await;

        assert_eq!(removed, 1);
        assert_eq!(limiter.tracked_clients().await, 1);
        // the evicted client starts over with a full bucket
        assert!(limiter.check("stale").await);
    }

    #[tokio::test]
    async fn test_sweep_bounds_tracked_clients() {
        let limiter = RateLimiter::new(1);

        for i in 0..SWEEP_THRESHOLD {
            limiter.check(&format!("client-{}", i)).await;
        }
        assert_eq!(limiter.tracked_clients().await, SWEEP_THRESHOLD);

        tokio::time::sleep(limiter.refill_window() + Duration::from_millis(50)).await;
        limiter.check("newcomer").await;

        assert_eq!(limiter.tracked_clients().await, 1);
    }

    #[test]
    fn test_forwarded_headers_ignored_unless_trusted() {
        let limiter = RateLimiter::new(1);
        let request = request_from("198.51.100.4:5000", Some("203.0.113.7, 10.0.0.1"));
        assert_eq!(limiter.client_for(&request), "198.51.100.4");

        let limiter = limiter.trust_proxy_headers(true);
        assert_eq!(limiter.client_for(&request), "203.0.113.7");

        let direct = request_from("198.51.100.4:5000", None);
        assert_eq!(limiter.client_for(&direct), "198.51.100.4");
    }

    #[tokio::test]
    async fn test_spoofed_forwarded_for_shares_peer_bucket() {
        let limiter = RateLimiter::new(1);

        let mut allowed = 0;
        for spoofed in ["1.1.1.1", "2.2.2.2", "3.3.3.3", "4.4.4.4"] {
            let request = request_from("192.0.2.9:4000", Some(spoofed));
            if limiter.check(&limiter.client_for(&request)).await {
                allowed += 1;
            }
        }

        assert_eq!(allowed, 2);
        assert_eq!(limiter.tracked_clients().await, 1);
    }

    #[test]
    fn test_forwarded_client_prefers_forwarded_for() {
        let mut headers = HeaderMap::new();
        assert_eq!(forwarded_client(&headers), None);

        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.2"));
        assert_eq!(forwarded_client(&headers).as_deref(), Some("10.0.0.2"));

        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.7, 10.0.0.1"),
        );
        assert_eq!(forwarded_client(&headers).as_deref(), Some("203.0.113.7"));
    }
}
