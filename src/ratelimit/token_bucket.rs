//! In-process token bucket limiter
//!
//! One governor bucket per [`RateKey`], created on first use and kept for the
//! process lifetime. Burst capacity equals the policy's `max_requests`; the
//! bucket refills at `max_requests` per `window`. Only correct for a single
//! instance, since every process holds its own buckets.

use std::num::NonZeroU32;
use std::time::Duration;

use async_trait::async_trait;
use governor::{
    clock::{Clock as GovernorClock, DefaultClock},
    middleware::{NoOpMiddleware, StateInformationMiddleware},
    state::keyed::DefaultKeyedStateStore,
    Quota, RateLimiter as Governor,
};
use nonzero_ext::nonzero;
use tracing::debug;

use super::{RateKey, RateLimitDecision, RateLimitPolicy, RateLimiter};
use crate::error::RateLimitError;

type KeyedGovernor<C> =
    Governor<RateKey, DefaultKeyedStateStore<RateKey>, C, StateInformationMiddleware>;

/// Governor-backed token bucket per key
pub struct TokenBucketLimiter<C: GovernorClock = DefaultClock> {
    limiter: KeyedGovernor<C>,
    clock: C,
    policy: RateLimitPolicy,
    replenish_every: Duration,
}

impl TokenBucketLimiter<DefaultClock> {
    pub fn new(policy: RateLimitPolicy) -> Self {
        Self::with_clock(policy, DefaultClock::default())
    }
}

impl<C: GovernorClock> TokenBucketLimiter<C> {
    /// Create a limiter driven by `clock`
    pub fn with_clock(policy: RateLimitPolicy, clock: C) -> Self {
        let burst = NonZeroU32::new(policy.max_requests).unwrap_or(nonzero!(1u32));
        let replenish_every = (policy.window / burst.get()).max(Duration::from_nanos(1));
        let quota = Quota::with_period(replenish_every)
            .unwrap_or_else(|| Quota::per_second(burst))
            .allow_burst(burst);

        let limiter = Governor::<
            RateKey,
            DefaultKeyedStateStore<RateKey>,
            C,
            NoOpMiddleware<C::Instant>,
        >::new(quota, DefaultKeyedStateStore::default(), &clock)
        .with_middleware::<StateInformationMiddleware>();

        Self {
            limiter,
            clock,
            policy,
            replenish_every,
        }
    }

    /// Number of keys with a live bucket
    pub fn len(&self) -> usize {
        self.limiter.len()
    }

    pub fn is_empty(&self) -> bool {
        self.limiter.is_empty()
    }
}

#[async_trait]
impl<C> RateLimiter for TokenBucketLimiter<C>
where
    C: GovernorClock + Send + Sync + 'static,
{
    async fn check(&self, key: &RateKey) -> Result<RateLimitDecision, RateLimitError> {
        let limit = i64::from(self.policy.max_requests);
        let now = chrono::Utc::now().timestamp();

        let decision = match self.limiter.check_key(key) {
            Ok(snapshot) => {
                let remaining = i64::from(snapshot.remaining_burst_capacity());
                let used = limit - remaining;
                // Time until the bucket is full again
                let refill = self.replenish_every * used.max(0) as u32;
                RateLimitDecision {
                    allowed: true,
                    limit,
                    remaining,
                    reset_at: now + refill.as_secs() as i64,
                    current: used,
                }
            }
            Err(not_until) => {
                let wait = not_until.wait_time_from(self.clock.now());
                RateLimitDecision {
                    allowed: false,
                    limit,
                    remaining: 0,
                    reset_at: now + wait.as_secs().max(1) as i64,
                    current: limit + 1,
                }
            }
        };

        debug!(
            group = %key.group,
            client = %key.client_address,
            route = %key.route,
            allowed = decision.allowed,
            remaining = decision.remaining,
            "Token bucket check"
        );

        Ok(decision)
    }

    fn policy(&self) -> RateLimitPolicy {
        self.policy
    }
}
