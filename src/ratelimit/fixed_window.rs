//! Fixed-window counter limiter
//!
//! Increment first, then set the window expiry only when the increment created
//! the counter (post-increment value of 1). Later requests in the window never
//! touch a running expiry, so the window cannot be pushed forward by traffic.
//! A counter found without any expiry (its EXPIRE failed) is given one.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::{
    CounterStore, RateKey, RateLimitDecision, RateLimitPolicy, RateLimiter, DEFAULT_KEY_PREFIX,
};
use crate::error::RateLimitError;

/// Fixed-window limiter over a [`CounterStore`]
pub struct FixedWindowLimiter {
    store: Arc<dyn CounterStore>,
    policy: RateLimitPolicy,
    key_prefix: String,
    store_timeout: Duration,
}

impl FixedWindowLimiter {
    /// Create a limiter with the default key prefix
    pub fn new(
        store: Arc<dyn CounterStore>,
        policy: RateLimitPolicy,
        store_timeout: Duration,
    ) -> Self {
        Self {
            store,
            policy,
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            store_timeout,
        }
    }

    /// Use a different key prefix
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    /// Bound a store round trip by the configured timeout
    async fn call<T>(
        &self,
        op: &'static str,
        fut: impl Future<Output = Result<T, RateLimitError>>,
    ) -> Result<T, RateLimitError> {
        tokio::time::timeout(self.store_timeout, fut)
            .await
            .map_err(|_| {
                RateLimitError::StoreUnavailable(format!(
                    "{} timed out after {}ms",
                    op,
                    self.store_timeout.as_millis()
                ))
            })?
    }
}

#[async_trait]
impl RateLimiter for FixedWindowLimiter {
    async fn check(&self, key: &RateKey) -> Result<RateLimitDecision, RateLimitError> {
        let storage_key = key.storage_key(&self.key_prefix);
        let window = self.policy.window;

        let count = self.call("INCR", self.store.incr(&storage_key)).await?;

        let ttl = if count == 1 {
            self.call("EXPIRE", self.store.expire(&storage_key, window))
                .await?;
            window
        } else {
            match self.call("TTL", self.store.ttl(&storage_key)).await? {
                Some(ttl) => ttl,
                None => {
                    warn!(key = %storage_key, count, "Rate limit counter has no expiry, restoring window");
                    self.call("EXPIRE", self.store.expire(&storage_key, window))
                        .await?;
                    window
                }
            }
        };

        debug!(
            group = %key.group,
            client = %key.client_address,
            route = %key.route,
            count,
            ttl_secs = ttl.as_secs(),
            "Rate limit counter"
        );

        let limit = i64::from(self.policy.max_requests);
        // Round up so the reset time is never reported early
        let reset_in = ttl.as_secs() + u64::from(ttl.subsec_nanos() > 0);

        Ok(RateLimitDecision {
            allowed: count <= limit,
            limit,
            remaining: limit - count,
            reset_at: chrono::Utc::now().timestamp() + reset_in as i64,
            current: count,
        })
    }

    fn policy(&self) -> RateLimitPolicy {
        self.policy
    }
}
