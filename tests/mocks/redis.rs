//! Redis test helpers
//!
//! Tests that need Redis connect to a local server and skip themselves when
//! none is running. Keys live under a unique prefix per test.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use redis::AsyncCommands;

/// Default Redis URL for testing
pub const TEST_REDIS_URL: &str = "redis://127.0.0.1:6379";

static TEST_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Connect to the test Redis, or `None` if it is not reachable
pub async fn get_test_redis() -> Option<redis::aio::ConnectionManager> {
    let client = redis::Client::open(TEST_REDIS_URL).ok()?;
    let mut conn = client.get_connection_manager().await.ok()?;
    redis::cmd("PING")
        .query_async::<_, String>(&mut conn)
        .await
        .ok()?;
    Some(conn)
}

/// Unique key prefix for one test
pub fn test_prefix(test_name: &str) -> String {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_millis();
    let n = TEST_COUNTER.fetch_add(1, Ordering::SeqCst);
    format!("gatehouse:test:{}:{}:{}", test_name, timestamp, n)
}

/// Delete every key under `prefix`
pub async fn cleanup_keys(conn: &mut redis::aio::ConnectionManager, prefix: &str) {
    let keys: Vec<String> = redis::cmd("KEYS")
        .arg(format!("{}*", prefix))
        .query_async(conn)
        .await
        .unwrap_or_default();

    for key in keys {
        let _: redis::RedisResult<()> = conn.del(&key).await;
    }
}
