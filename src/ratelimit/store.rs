//! Counter stores for fixed-window rate limiting
//!
//! A store offers three primitives on string-keyed integer counters:
//! atomic increment (returning the post-increment value), expire-with-TTL and
//! TTL query. Redis provides them natively; `InMemoryCounterStore` mirrors the
//! same semantics for single-instance deployments and tests.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use redis::AsyncCommands;

use super::clock::{Clock, SystemClock};
use crate::error::RateLimitError;

/// Backing store for fixed-window counters
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Increment `key` by one and return the new value.
    ///
    /// A missing or expired key starts again from zero.
    async fn incr(&self, key: &str) -> Result<i64, RateLimitError>;

    /// Expire `key` after `ttl`
    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), RateLimitError>;

    /// Remaining time to live, `None` if the key is missing or has no expiry
    async fn ttl(&self, key: &str) -> Result<Option<Duration>, RateLimitError>;
}

/// Redis-backed counter store (shared across instances)
#[derive(Clone)]
pub struct RedisCounterStore {
    conn: redis::aio::ConnectionManager,
}

impl RedisCounterStore {
    pub fn new(conn: redis::aio::ConnectionManager) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl CounterStore for RedisCounterStore {
    async fn incr(&self, key: &str) -> Result<i64, RateLimitError> {
        let mut conn = self.conn.clone();
        let value: i64 = conn.incr(key, 1i64).await?;
        Ok(value)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), RateLimitError> {
        let mut conn = self.conn.clone();
        // EXPIRE has whole-second resolution
        let seconds = ttl.as_secs().max(1) as i64;
        conn.expire::<_, ()>(key, seconds).await?;
        Ok(())
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>, RateLimitError> {
        let mut conn = self.conn.clone();
        // -2 = missing, -1 = no expiry
        let seconds: i64 = conn.ttl(key).await?;
        Ok((seconds >= 0).then(|| Duration::from_secs(seconds as u64)))
    }
}

#[derive(Debug)]
struct Counter {
    count: i64,
    expires_at: Option<Instant>,
}

impl Counter {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.map(|exp| now >= exp).unwrap_or(false)
    }
}

/// In-process counter store (single instance only)
///
/// Each key is mutated under its `DashMap` shard lock, so a window reset and
/// the increment that follows it are atomic with respect to other callers.
#[derive(Debug)]
pub struct InMemoryCounterStore<C: Clock = SystemClock> {
    counters: DashMap<String, Counter>,
    clock: C,
}

impl InMemoryCounterStore<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for InMemoryCounterStore<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> InMemoryCounterStore<C> {
    pub fn with_clock(clock: C) -> Self {
        Self {
            counters: DashMap::new(),
            clock,
        }
    }

    /// Drop counters whose window has elapsed
    pub fn purge_expired(&self) {
        let now = self.clock.now();
        self.counters.retain(|_, counter| !counter.is_expired(now));
    }

    /// Number of tracked keys
    pub fn len(&self) -> usize {
        self.counters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }
}

#[async_trait]
impl<C: Clock> CounterStore for InMemoryCounterStore<C> {
    async fn incr(&self, key: &str) -> Result<i64, RateLimitError> {
        let now = self.clock.now();
        let mut counter = self.counters.entry(key.to_string()).or_insert(Counter {
            count: 0,
            expires_at: None,
        });

        if counter.is_expired(now) {
            counter.count = 0;
            counter.expires_at = None;
        }
        counter.count += 1;
        Ok(counter.count)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), RateLimitError> {
        let now = self.clock.now();
        if let Some(mut counter) = self.counters.get_mut(key) {
            counter.expires_at = Some(now + ttl);
        }
        Ok(())
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>, RateLimitError> {
        let now = self.clock.now();
        Ok(self.counters.get(key).and_then(|counter| {
            if counter.is_expired(now) {
                None
            } else {
                counter.expires_at.map(|exp| exp.saturating_duration_since(now))
            }
        }))
    }
}
