//! Counter store outages
//!
//! Fail-closed by default (500 `RATE_LIMIT_UNAVAILABLE`); fail-open lets the
//! request through when configured.

use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use pretty_assertions::assert_eq;
use serde_json::Value;

use gatehouse::ratelimit::ManualClock;

use crate::common::{test_config, TestApp};
use crate::mocks::{HangingStore, UnreachableStore};

#[tokio::test]
async fn test_unreachable_store_fails_closed() {
    let app = TestApp::with_store(test_config(), Arc::new(UnreachableStore), ManualClock::new());

    let response = app.get_authed("/api/private/alltodos").await;
    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);

    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "RATE_LIMIT_UNAVAILABLE");
}

#[tokio::test]
async fn test_unreachable_store_fails_open_when_configured() {
    let mut config = test_config();
    config.rate_limit_fail_open = true;
    let app = TestApp::with_store(config, Arc::new(UnreachableStore), ManualClock::new());

    let response = app.get_authed("/api/private/alltodos").await;
    response.assert_status_ok();
    assert!(!response.headers().contains_key("x-ratelimit-limit"));
}

#[tokio::test]
async fn test_hanging_store_times_out_and_fails_closed() {
    let mut config = test_config();
    config.rate_limit_store_timeout = Duration::from_millis(50);
    let app = TestApp::with_store(config, Arc::new(HangingStore), ManualClock::new());

    let response = app.get_authed("/api/private/alltodos").await;
    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);

    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "RATE_LIMIT_UNAVAILABLE");
}
