//! Per-identity request quotas
//!
//! Two interchangeable strategies implement [`RateLimiter`]:
//!
//! - [`FixedWindowLimiter`] counts requests per window in a [`CounterStore`]
//!   (Redis for multi-instance deployments, memory for a single instance).
//! - [`TokenBucketLimiter`] keeps a governor token bucket per key in process.
//!
//! A deployment selects exactly one; they are never combined.

pub mod clock;
pub mod fixed_window;
pub mod store;
pub mod token_bucket;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::http::{header, HeaderName, HeaderValue};

use crate::error::RateLimitError;

pub use clock::{Clock, ManualClock, SystemClock};
pub use fixed_window::FixedWindowLimiter;
pub use store::{CounterStore, InMemoryCounterStore, RedisCounterStore};
pub use token_bucket::TokenBucketLimiter;

/// Default Redis key prefix for counters
pub const DEFAULT_KEY_PREFIX: &str = "gatehouse:ratelimit";

/// Route surface a limiter policy applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LimiterGroup {
    Public,
    Private,
}

impl LimiterGroup {
    pub fn as_str(&self) -> &'static str {
        match self {
            LimiterGroup::Public => "public",
            LimiterGroup::Private => "private",
        }
    }
}

impl fmt::Display for LimiterGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity a quota is counted against
///
/// Counters are independent per client, route and group.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RateKey {
    pub client_address: String,
    pub route: String,
    pub group: LimiterGroup,
}

impl RateKey {
    pub fn new(
        client_address: impl Into<String>,
        route: impl Into<String>,
        group: LimiterGroup,
    ) -> Self {
        Self {
            client_address: client_address.into(),
            route: route.into(),
            group,
        }
    }

    /// Counter key under `prefix`
    pub fn storage_key(&self, prefix: &str) -> String {
        format!("{}:{}", prefix, self)
    }
}

impl fmt::Display for RateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group, self.client_address, self.route)
    }
}

/// Quota: `max_requests` per `window`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    pub max_requests: u32,
    pub window: Duration,
}

impl RateLimitPolicy {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
        }
    }
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self {
            max_requests: 5,
            window: Duration::from_secs(60),
        }
    }
}

/// Rate limit check result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitDecision {
    /// Whether the request is allowed
    pub allowed: bool,
    /// Maximum requests allowed in window
    pub limit: i64,
    /// Remaining requests in current window
    pub remaining: i64,
    /// Unix timestamp when the quota resets
    pub reset_at: i64,
    /// Requests counted in the current window
    pub current: i64,
}

impl RateLimitDecision {
    /// Seconds until a retry may succeed (at least 1)
    pub fn retry_after(&self) -> i64 {
        (self.reset_at - chrono::Utc::now().timestamp()).max(1)
    }

    /// Create rate limit headers for the response
    pub fn headers(&self) -> Vec<(HeaderName, HeaderValue)> {
        let mut headers = vec![
            (
                HeaderName::from_static("x-ratelimit-limit"),
                HeaderValue::from(self.limit),
            ),
            (
                HeaderName::from_static("x-ratelimit-remaining"),
                HeaderValue::from(self.remaining.max(0)),
            ),
            (
                HeaderName::from_static("x-ratelimit-reset"),
                HeaderValue::from(self.reset_at),
            ),
        ];

        if !self.allowed {
            headers.push((header::RETRY_AFTER, HeaderValue::from(self.retry_after())));
        }

        headers
    }
}

/// A per-key request quota
#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Count one request against `key` and decide whether it may proceed
    async fn check(&self, key: &RateKey) -> Result<RateLimitDecision, RateLimitError>;

    /// Policy this limiter enforces
    fn policy(&self) -> RateLimitPolicy;
}

/// One limiter per route group
#[derive(Clone)]
pub struct RateLimiters {
    pub public: Arc<dyn RateLimiter>,
    pub private: Arc<dyn RateLimiter>,
}

impl RateLimiters {
    pub fn new(public: Arc<dyn RateLimiter>, private: Arc<dyn RateLimiter>) -> Self {
        Self { public, private }
    }

    pub fn for_group(&self, group: LimiterGroup) -> &Arc<dyn RateLimiter> {
        match group {
            LimiterGroup::Public => &self.public,
            LimiterGroup::Private => &self.private,
        }
    }
}
