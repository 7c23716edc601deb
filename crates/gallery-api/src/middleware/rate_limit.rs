use crate::error::HttpAppError;
use crate::utils::ip_extraction::extract_client_ip;
use axum::{
    extract::{ConnectInfo, Request, State},
    http::HeaderValue,
    middleware::Next,
    response::{IntoResponse, Response},
};
use gallery_core::AppError;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Fixed-window counter for one client.
#[derive(Clone)]
struct RateLimitBucket {
    count: u32,
    reset_at: Instant,
}

impl RateLimitBucket {
    fn new(window_seconds: u64) -> Self {
        Self {
            count: 0,
            reset_at: Instant::now() + Duration::from_secs(window_seconds),
        }
    }

    fn check_and_increment(&mut self, limit: u32, window_seconds: u64) -> (bool, u32) {
        let now = Instant::now();

        if now >= self.reset_at {
            self.count = 0;
            self.reset_at = now + Duration::from_secs(window_seconds);
        }

        if self.count < limit {
            self.count += 1;
            (true, limit.saturating_sub(self.count))
        } else {
            (false, 0)
        }
    }

    fn reset_in(&self) -> Duration {
        self.reset_at.saturating_duration_since(Instant::now())
    }

    fn is_stale(&self, now: Instant, grace_period: Duration) -> bool {
        self.reset_at <= now && now - self.reset_at >= grace_period
    }
}

/// Sharded rate limiter to reduce lock contention
///
/// Uses multiple shards (separate HashMaps) to distribute load and reduce
/// contention on a single mutex. Keys are hashed to determine which shard to use.
/// Built once at startup and handed to the middleware as state.
#[derive(Clone)]
pub struct HttpRateLimiter {
    shards: Vec<Arc<Mutex<HashMap<String, RateLimitBucket>>>>,
    shard_count: usize,
    limit_per_minute: u32,
    window_seconds: u64,
    max_buckets: usize, // per shard
    trusted_proxy_count: usize,
}

impl HttpRateLimiter {
    /// Create a new rate limiter with default shard count (16 shards)
    pub fn new(limit_per_minute: u32) -> Self {
        Self::with_shards(limit_per_minute, 16)
    }

    pub fn with_shards(limit_per_minute: u32, shard_count: usize) -> Self {
        let shard_count = shard_count.max(1);
        let shards = (0..shard_count)
            .map(|_| Arc::new(Mutex::new(HashMap::new())))
            .collect();
        Self {
            shards,
            shard_count,
            limit_per_minute,
            window_seconds: 60,
            max_buckets: 10_000,
            trusted_proxy_count: 0,
        }
    }

    pub fn with_trusted_proxies(mut self, trusted_proxy_count: usize) -> Self {
        self.trusted_proxy_count = trusted_proxy_count;
        self
    }

    fn shard_index(&self, key: &str) -> usize {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        key.hash(&mut hasher);
        (hasher.finish() as usize) % self.shard_count
    }

    /// Drop buckets whose window ended more than one window ago.
    pub async fn cleanup_expired_buckets(&self) {
        self.cleanup_at(Instant::now()).await;
    }

    async fn cleanup_at(&self, now: Instant) {
        let grace_period = Duration::from_secs(self.window_seconds);
        let mut total_cleaned = 0;

        for shard in &self.shards {
            let mut buckets = shard.lock().await;
            let before_count = buckets.len();
            buckets.retain(|_key, bucket| !bucket.is_stale(now, grace_period));
            total_cleaned += before_count - buckets.len();
        }

        if total_cleaned > 0 {
            tracing::debug!(
                buckets_cleaned = total_cleaned,
                "Cleaned up expired rate limit buckets across all shards"
            );
        }
    }

    /// Count one request for `key`. Returns the remaining allowance, or the
    /// time until the window resets when the limit is exhausted.
    pub async fn check_rate_limit(&self, key: &str) -> Result<u32, Duration> {
        let shard_index = self.shard_index(key);
        let mut buckets = self.shards[shard_index].lock().await;

        if buckets.len() >= self.max_buckets && !buckets.contains_key(key) {
            let now = Instant::now();
            let grace_period = Duration::from_secs(self.window_seconds);
            buckets.retain(|_key, bucket| !bucket.is_stale(now, grace_period));

            // Still full: evict the bucket closest to expiry
            if buckets.len() >= self.max_buckets {
                let oldest_key = buckets
                    .iter()
                    .min_by_key(|(_, bucket)| bucket.reset_at)
                    .map(|(k, _)| k.clone());

                if let Some(key_to_remove) = oldest_key {
                    buckets.remove(&key_to_remove);
                    tracing::debug!(
                        removed_key = %key_to_remove,
                        shard_index = shard_index,
                        "Evicted oldest rate limit bucket due to capacity limit"
                    );
                }
            }
        }

        let window_seconds = self.window_seconds;
        let bucket = buckets
            .entry(key.to_string())
            .or_insert_with(|| RateLimitBucket::new(window_seconds));

        let (allowed, remaining) = bucket.check_and_increment(self.limit_per_minute, window_seconds);
        if allowed {
            Ok(remaining)
        } else {
            Err(bucket.reset_in())
        }
    }
}

/// HTTP rate limiting middleware
///
/// Keys requests by client IP (see [`extract_client_ip`]) and adds
/// `X-RateLimit-Limit` / `X-RateLimit-Remaining` headers to every response.
/// Over the limit the request is answered with `429 Too Many Requests` and a
/// `Retry-After` header.
pub async fn rate_limit_middleware(
    State(rate_limiter): State<Arc<HttpRateLimiter>>,
    request: Request,
    next: Next,
) -> Response {
    let socket_addr = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let ip = extract_client_ip(
        request.headers(),
        socket_addr.as_ref(),
        rate_limiter.trusted_proxy_count,
    );
    let rate_limit_key = format!("ip:{}", ip);
    let limit = rate_limiter.limit_per_minute;

    let (mut response, remaining) = match rate_limiter.check_rate_limit(&rate_limit_key).await {
        Ok(remaining) => (next.run(request).await, remaining),
        Err(reset_in) => {
            tracing::warn!(
                key = %rate_limit_key,
                path = %request.uri().path(),
                limit = limit,
                "Rate limit exceeded"
            );
            let response = HttpAppError(AppError::RateLimited {
                retry_after_secs: reset_in.as_secs().max(1),
            })
            .into_response();
            (response, 0)
        }
    };

    if let Ok(header_value) = HeaderValue::from_str(&limit.to_string()) {
        response
            .headers_mut()
            .insert("X-RateLimit-Limit", header_value);
    }
    if let Ok(header_value) = HeaderValue::from_str(&remaining.to_string()) {
        response
            .headers_mut()
            .insert("X-RateLimit-Remaining", header_value);
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_limit_enforced_per_key() {
        let limiter = HttpRateLimiter::new(3);

        assert_eq!(limiter.check_rate_limit("ip:1.1.1.1").await, Ok(2));
        assert_eq!(limiter.check_rate_limit("ip:1.1.1.1").await, Ok(1));
        assert_eq!(limiter.check_rate_limit("ip:1.1.1.1").await, Ok(0));

        let reset_in = limiter.check_rate_limit("ip:1.1.1.1").await.unwrap_err();
        assert!(reset_in <= Duration::from_secs(60));

        // Another client has its own window
        assert_eq!(limiter.check_rate_limit("ip:2.2.2.2").await, Ok(2));
    }

    #[test]
    fn test_bucket_resets_after_window() {
        let mut bucket = RateLimitBucket::new(60);
        assert_eq!(bucket.check_and_increment(1, 60), (true, 0));
        assert_eq!(bucket.check_and_increment(1, 60), (false, 0));

        bucket.reset_at = Instant::now();
        assert_eq!(bucket.check_and_increment(1, 60), (true, 0));
    }

    #[tokio::test]
    async fn test_cleanup_removes_stale_buckets() {
        let limiter = HttpRateLimiter::with_shards(5, 1);
        limiter.check_rate_limit("ip:stale").await.unwrap();
        limiter.check_rate_limit("ip:fresh").await.unwrap();

        let now = Instant::now();
        {
            let mut buckets = limiter.shards[0].lock().await;
            if let Some(bucket) = buckets.get_mut("ip:stale") {
                bucket.reset_at = now;
            }
            if let Some(bucket) = buckets.get_mut("ip:fresh") {
                bucket.reset_at = now + Duration::from_secs(300);
            }
        }

        limiter.cleanup_at(now + Duration::from_secs(120)).await;
        let buckets = limiter.shards[0].lock().await;
        assert!(!buckets.contains_key("ip:stale"));
        assert!(buckets.contains_key("ip:fresh"));
    }
}
