//! Counter stores that simulate an unreachable or unresponsive backend

use std::time::Duration;

use async_trait::async_trait;
use gatehouse::error::RateLimitError;
use gatehouse::ratelimit::CounterStore;

/// Every call fails as if the connection were refused
pub struct UnreachableStore;

#[async_trait]
impl CounterStore for UnreachableStore {
    async fn incr(&self, _key: &str) -> Result<i64, RateLimitError> {
        Err(RateLimitError::StoreUnavailable(
            "connection refused".to_string(),
        ))
    }

    async fn expire(&self, _key: &str, _ttl: Duration) -> Result<(), RateLimitError> {
        Err(RateLimitError::StoreUnavailable(
            "connection refused".to_string(),
        ))
    }

    async fn ttl(&self, _key: &str) -> Result<Option<Duration>, RateLimitError> {
        Err(RateLimitError::StoreUnavailable(
            "connection refused".to_string(),
        ))
    }
}

/// Every call hangs until the caller's timeout fires
pub struct HangingStore;

#[async_trait]
impl CounterStore for HangingStore {
    async fn incr(&self, _key: &str) -> Result<i64, RateLimitError> {
        std::future::pending().await
    }

    async fn expire(&self, _key: &str, _ttl: Duration) -> Result<(), RateLimitError> {
        std::future::pending().await
    }

    async fn ttl(&self, _key: &str) -> Result<Option<Duration>, RateLimitError> {
        std::future::pending().await
    }
}
