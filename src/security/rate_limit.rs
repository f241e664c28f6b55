//! Sliding-window rate limiting with hard blocks for authentication paths.
//!
//! # Responsibilities
//! - Count requests per client IP and path class inside a fixed-length window
//! - Hold authentication paths to a stricter threshold
//! - Block an IP outright after it exceeds the strict threshold
//!
//! # Design Decisions
//! - Windows start at the first request of a key, not on calendar boundaries
//! - A live block is checked before any counting and gates every path class
//! - Only the request that makes `count > limit` trips the limit
//! - The policy is swappable on config reload; the registry is not

use std::sync::Arc;
use std::time::Duration;

use axum::http::{HeaderMap, HeaderName, HeaderValue};
use serde::Serialize;

use crate::config::RateLimitConfig;
use crate::observability::metrics;
use crate::security::clock::Clock;
use crate::security::rejection::Rejection;
use crate::security::store::{duration_millis, BlockEntry, RateLimiterStore, RegistryEntry};

pub const X_RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
pub const X_RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
pub const X_RATELIMIT_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");

/// Sensitivity class of a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathClass {
    Strict,
    Default,
}

impl PathClass {
    pub fn bucket_key(self, ip: &str) -> String {
        match self {
            PathClass::Strict => format!("strict:{ip}"),
            PathClass::Default => format!("api:{ip}"),
        }
    }
}

/// Registry key of the block entry for an IP.
pub fn block_key(ip: &str) -> String {
    format!("blocked:{ip}")
}

/// Values for the `X-RateLimit-*` headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitInfo {
    pub limit: u32,
    pub remaining: u32,
    /// Window reset, epoch seconds.
    pub reset: u64,
}

impl RateLimitInfo {
    pub fn apply(&self, headers: &mut HeaderMap) {
        headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from(self.limit));
        headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from(self.remaining));
        headers.insert(X_RATELIMIT_RESET, HeaderValue::from(self.reset));
    }
}

/// Thresholds and path classification, built from [`RateLimitConfig`].
#[derive(Debug, Clone)]
pub struct RateLimitPolicy {
    pub enabled: bool,
    pub window: Duration,
    pub default_limit: u32,
    pub strict_limit: u32,
    pub block: Duration,
    pub api_prefix: String,
    pub strict_paths: Vec<String>,
    pub max_entries: usize,
}

impl From<&RateLimitConfig> for RateLimitPolicy {
    fn from(config: &RateLimitConfig) -> Self {
        Self {
            enabled: config.enabled,
            window: Duration::from_secs(config.window_secs),
            default_limit: config.default_limit,
            strict_limit: config.strict_limit,
            block: Duration::from_secs(config.block_secs),
            api_prefix: config.api_prefix.clone(),
            strict_paths: config.strict_paths.clone(),
            max_entries: config.max_entries,
        }
    }
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self::from(&RateLimitConfig::default())
    }
}

impl RateLimitPolicy {
    /// Whether the path is an API route at all.
    pub fn is_api(&self, path: &str) -> bool {
        path.starts_with(&self.api_prefix)
    }

    pub fn classify(&self, path: &str) -> PathClass {
        if self.strict_paths.iter().any(|p| path.starts_with(p.as_str())) {
            PathClass::Strict
        } else {
            PathClass::Default
        }
    }

    pub fn limit_for(&self, class: PathClass) -> u32 {
        match class {
            PathClass::Strict => self.strict_limit,
            PathClass::Default => self.default_limit,
        }
    }

    fn retry_after_secs(&self, class: PathClass) -> u64 {
        match class {
            PathClass::Strict => self.block.as_secs(),
            PathClass::Default => self.window.as_secs(),
        }
    }
}

/// A client IP under a live block.
#[derive(Debug, Clone, Serialize)]
pub struct BlockedClient {
    pub ip: String,
    pub blocked_until: u64,
    pub remaining_secs: u64,
}

/// Rate limiter over an injectable registry and clock.
#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn RateLimiterStore>,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn RateLimiterStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Account one request.
    ///
    /// Returns `Ok(None)` for paths outside the API prefix (or when limiting
    /// is disabled), `Ok(Some(info))` when admitted, and a 429 rejection
    /// when blocked or over the limit.
    pub fn check(
        &self,
        policy: &RateLimitPolicy,
        ip: &str,
        path: &str,
    ) -> Result<Option<RateLimitInfo>, Rejection> {
        if !policy.enabled || !policy.is_api(path) {
            return Ok(None);
        }

        let now = self.clock.now_millis();
        let swept = self.store.sweep(now, policy.window);
        if swept > 0 {
            tracing::debug!(swept, "Pruned expired rate-limit entries");
        }

        let class = policy.classify(path);
        let bucket = class.bucket_key(ip);

        if let Some(RegistryEntry::Block(block)) = self.store.get(&block_key(ip)) {
            if block.blocked_until > now {
                return Err(Rejection::Blocked {
                    retry_after_secs: ceil_div(block.blocked_until - now, 1000),
                });
            }
        }

        let window = self.store.hit(&bucket, now, policy.window);
        if policy.max_entries > 0 {
            let evicted = self.store.enforce_capacity(policy.max_entries, &bucket);
            if evicted > 0 {
                tracing::warn!(evicted, max = policy.max_entries, "Rate-limit registry at capacity");
            }
        }
        metrics::record_registry_size(self.store.len());

        let limit = policy.limit_for(class);
        let info = RateLimitInfo {
            limit,
            remaining: limit.saturating_sub(window.count),
            reset: ceil_div(window.window_reset_at, 1000),
        };

        if window.count > limit {
            if class == PathClass::Strict {
                let blocked_until = now.saturating_add(duration_millis(policy.block));
                self.store
                    .set(&block_key(ip), RegistryEntry::Block(BlockEntry { blocked_until }));
                tracing::warn!(client = %ip, path = %path, block_secs = policy.block.as_secs(), "Client blocked");
            }
            return Err(Rejection::RateLimitExceeded {
                class,
                info,
                retry_after_secs: policy.retry_after_secs(class),
            });
        }

        Ok(Some(info))
    }

    /// Live blocks, soonest to lift first.
    pub fn blocked_clients(&self) -> Vec<BlockedClient> {
        let now = self.clock.now_millis();
        let mut clients: Vec<BlockedClient> = self
            .store
            .blocks()
            .into_iter()
            .filter(|(_, b)| b.blocked_until > now)
            .map(|(key, b)| BlockedClient {
                ip: key.strip_prefix("blocked:").unwrap_or(&key).to_string(),
                blocked_until: b.blocked_until,
                remaining_secs: ceil_div(b.blocked_until - now, 1000),
            })
            .collect();
        clients.sort_by_key(|c| c.blocked_until);
        clients
    }

    /// Lift the block on an IP. Returns whether a block existed.
    pub fn unblock(&self, ip: &str) -> bool {
        matches!(self.store.remove(&block_key(ip)), Some(RegistryEntry::Block(_)))
    }

    pub fn registry_len(&self) -> usize {
        self.store.len()
    }
}

fn ceil_div(value: u64, by: u64) -> u64 {
    value.div_ceil(by)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::clock::ManualClock;
    use crate::security::store::InMemoryStore;

    const START: u64 = 1_700_000_000_000;
    const IP: &str = "203.0.113.9";

    fn limiter() -> (RateLimiter, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(START));
        let limiter = RateLimiter::new(Arc::new(InMemoryStore::new()), clock.clone());
        (limiter, clock)
    }

    #[test]
    fn test_non_api_paths_are_skipped() {
        let (limiter, _) = limiter();
        let policy = RateLimitPolicy::default();
        for _ in 0..500 {
            assert_eq!(limiter.check(&policy, IP, "/blog/rust-vs-go"), Ok(None));
        }
        assert_eq!(limiter.registry_len(), 0);
    }

    #[test]
    fn test_default_threshold_allows_exactly_limit() {
        let (limiter, _) = limiter();
        let policy = RateLimitPolicy::default();

        for n in 1..=100u32 {
            let info = limiter.check(&policy, IP, "/api/posts").unwrap().unwrap();
            assert_eq!(info.limit, 100);
            assert_eq!(info.remaining, 100 - n);
            assert_eq!(info.reset, (START + 900_000) / 1000);
        }

        match limiter.check(&policy, IP, "/api/posts") {
            Err(Rejection::RateLimitExceeded { class, info, retry_after_secs }) => {
                assert_eq!(class, PathClass::Default);
                assert_eq!(info.remaining, 0);
                assert_eq!(retry_after_secs, 900);
            }
            other => panic!("expected rate limit, got {other:?}"),
        }

        // Default violations never block.
        assert!(limiter.blocked_clients().is_empty());
    }

    #[test]
    fn test_window_resets_after_expiry() {
        let (limiter, clock) = limiter();
        let policy = RateLimitPolicy::default();

        for _ in 0..101 {
            let _ = limiter.check(&policy, IP, "/api/posts");
        }
        clock.advance(Duration::from_secs(901));

        let info = limiter.check(&policy, IP, "/api/posts").unwrap().unwrap();
        assert_eq!(info.remaining, 99);
    }

    #[test]
    fn test_strict_violation_blocks_ip() {
        let (limiter, clock) = limiter();
        let policy = RateLimitPolicy::default();

        for _ in 0..5 {
            assert!(limiter.check(&policy, IP, "/api/auth/signin").is_ok());
        }
        match limiter.check(&policy, IP, "/api/auth/signin") {
            Err(Rejection::RateLimitExceeded { class: PathClass::Strict, retry_after_secs, .. }) => {
                assert_eq!(retry_after_secs, 3600);
            }
            other => panic!("expected strict limit, got {other:?}"),
        }

        clock.advance(Duration::from_millis(1));
        assert_eq!(
            limiter.check(&policy, IP, "/api/auth/2fa/verify"),
            Err(Rejection::Blocked { retry_after_secs: 3600 })
        );
        // The block is keyed by IP, so default-class API paths are gated too.
        assert!(matches!(
            limiter.check(&policy, IP, "/api/posts"),
            Err(Rejection::Blocked { .. })
        ));

        let blocked = limiter.blocked_clients();
        assert_eq!(blocked.len(), 1);
        assert_eq!(blocked[0].ip, IP);

        // Other clients are unaffected.
        assert!(limiter.check(&policy, "198.51.100.1", "/api/auth/signin").is_ok());
    }

    #[test]
    fn test_blocked_requests_are_not_counted() {
        let (limiter, clock) = limiter();
        let policy = RateLimitPolicy::default();

        for _ in 0..6 {
            let _ = limiter.check(&policy, IP, "/api/auth/signin");
        }
        for _ in 0..50 {
            let _ = limiter.check(&policy, IP, "/api/posts");
        }

        // Lift the block: the default bucket was never touched.
        assert!(limiter.unblock(IP));
        assert!(!limiter.unblock(IP));
        clock.advance(Duration::from_secs(1));
        let info = limiter.check(&policy, IP, "/api/posts").unwrap().unwrap();
        assert_eq!(info.remaining, 99);
    }

    #[test]
    fn test_block_expiry_does_not_reset_window() {
        let (limiter, clock) = limiter();
        let policy = RateLimitPolicy {
            window: Duration::from_secs(7200),
            ..RateLimitPolicy::default()
        };

        for _ in 0..6 {
            let _ = limiter.check(&policy, IP, "/api/auth/signin");
        }
        clock.advance(Duration::from_secs(3601));

        // Block is over but the 2h window still holds 6 hits: the 7th trips again.
        assert!(matches!(
            limiter.check(&policy, IP, "/api/auth/signin"),
            Err(Rejection::RateLimitExceeded { class: PathClass::Strict, .. })
        ));
    }

    #[test]
    fn test_block_expiry_with_expired_window_starts_fresh() {
        let (limiter, clock) = limiter();
        let policy = RateLimitPolicy::default();

        for _ in 0..6 {
            let _ = limiter.check(&policy, IP, "/api/auth/signin");
        }
        clock.advance(Duration::from_secs(3601));

        let info = limiter.check(&policy, IP, "/api/auth/signin").unwrap().unwrap();
        assert_eq!(info.limit, 5);
        assert_eq!(info.remaining, 4);
    }

    #[test]
    fn test_blocked_retry_after_rounds_up() {
        let (limiter, clock) = limiter();
        let policy = RateLimitPolicy::default();

        for _ in 0..6 {
            let _ = limiter.check(&policy, IP, "/api/auth/signup");
        }
        clock.set(START + 1500);
        assert_eq!(
            limiter.check(&policy, IP, "/api/auth/signup"),
            Err(Rejection::Blocked { retry_after_secs: 3599 })
        );
    }

    #[test]
    fn test_same_sequence_same_decisions() {
        let run = || {
            let (limiter, clock) = limiter();
            let policy = RateLimitPolicy::default();
            (0..20)
                .map(|i| {
                    clock.advance(Duration::from_secs(30));
                    let path = if i % 3 == 0 { "/api/auth/signin" } else { "/api/posts" };
                    limiter.check(&policy, IP, path)
                })
                .collect::<Vec<_>>()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_disabled_policy_skips() {
        let (limiter, _) = limiter();
        let policy = RateLimitPolicy { enabled: false, ..RateLimitPolicy::default() };
        assert_eq!(limiter.check(&policy, IP, "/api/auth/signin"), Ok(None));
    }

    #[test]
    fn test_capacity_cap_does_not_forget_current_client() {
        let (limiter, _) = limiter();
        let policy = RateLimitPolicy {
            strict_limit: 2,
            max_entries: 2,
            ..RateLimitPolicy::default()
        };

        // One client retries a strict path while fresh addresses fill the
        // registry in the same millisecond.
        let mut outcomes = Vec::new();
        for n in 1..=4 {
            outcomes.push(limiter.check(&policy, "1.1.1.1", "/api/auth/signin"));
            let _ = limiter.check(&policy, &format!("9.9.9.{n}"), "/api/auth/signin");
        }

        assert!(outcomes[0].is_ok());
        assert!(outcomes[1].is_ok());
        assert!(matches!(
            outcomes[2],
            Err(Rejection::RateLimitExceeded { class: PathClass::Strict, .. })
        ));
        assert!(matches!(outcomes[3], Err(Rejection::Blocked { .. })));
        assert_eq!(limiter.blocked_clients()[0].ip, "1.1.1.1");
    }

    #[test]
    fn test_oversized_durations_do_not_overflow() {
        let (limiter, _) = limiter();
        let policy = RateLimitPolicy {
            window: Duration::from_secs(u64::MAX / 1000),
            block: Duration::from_secs(u64::MAX / 1000),
            ..RateLimitPolicy::default()
        };

        for _ in 0..100 {
            assert!(limiter.check(&policy, IP, "/api/posts").is_ok());
        }
        assert!(limiter.check(&policy, IP, "/api/posts").is_err());

        for _ in 0..6 {
            let _ = limiter.check(&policy, IP, "/api/auth/signin");
        }
        assert_eq!(limiter.blocked_clients()[0].blocked_until, u64::MAX);
    }
}
