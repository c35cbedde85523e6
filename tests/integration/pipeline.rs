//! End-to-end rate limiting through the router
//!
//! - Five requests per route per minute from one client, the sixth is 429
//! - The window resets after it elapses
//! - Routes, groups and clients are counted independently
//! - The limiter runs before authentication

use std::time::Duration;

use axum::http::{HeaderName, HeaderValue, StatusCode};
use pretty_assertions::assert_eq;
use serde_json::Value;

use crate::common::TestApp;

#[tokio::test]
async fn test_sixth_request_denied_then_allowed_after_window() {
    let app = TestApp::new();

    for expected_remaining in (0..5).rev() {
        let response = app.get_authed("/api/private/alltodos").await;
        response.assert_status_ok();
        assert_eq!(
            response.header("x-ratelimit-remaining"),
            expected_remaining.to_string()
        );
        assert_eq!(response.header("x-ratelimit-limit"), "5");
    }

    let denied = app.get_authed("/api/private/alltodos").await;
    denied.assert_status(StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(denied.header("x-ratelimit-remaining"), "0");
    assert!(denied.headers().contains_key("retry-after"));

    let body: Value = denied.json();
    assert_eq!(body["error"]["code"], "RATE_LIMIT_EXCEEDED");
    assert_eq!(body["error"]["details"]["limit"], 5);
    assert_eq!(body["error"]["details"]["used"], 6);

    app.clock.advance(Duration::from_secs(61));

    let fresh = app.get_authed("/api/private/alltodos").await;
    fresh.assert_status_ok();
    assert_eq!(fresh.header("x-ratelimit-remaining"), "4");
}

#[tokio::test]
async fn test_routes_have_independent_quotas() {
    let app = TestApp::new();

    for _ in 0..5 {
        app.get_authed("/api/private/alltodos").await.assert_status_ok();
    }
    app.get_authed("/api/private/alltodos")
        .await
        .assert_status(StatusCode::TOO_MANY_REQUESTS);

    let other = app.get_authed("/api/private/getone/1").await;
    other.assert_status_ok();
    assert_eq!(other.header("x-ratelimit-remaining"), "4");
}

#[tokio::test]
async fn test_route_template_shares_one_quota() {
    let app = TestApp::new();

    for id in 0..5 {
        app.get_authed(&format!("/api/private/getone/{}", id))
            .await
            .assert_status_ok();
    }

    app.get_authed("/api/private/getone/99")
        .await
        .assert_status(StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_clients_have_independent_quotas() {
    let app = TestApp::new();

    for _ in 0..6 {
        app.get_authed("/api/private/alltodos").await;
    }

    let token = app.token();
    let response = crate::common::with_bearer(app.server.get("/api/private/alltodos"), &token)
        .add_header(
            HeaderName::from_static("x-forwarded-for"),
            HeaderValue::from_static("5.6.7.8"),
        )
        .await;
    response.assert_status_ok();
}

#[tokio::test]
async fn test_rate_limit_applies_before_authentication() {
    let app = TestApp::new();

    for _ in 0..5 {
        app.get("/api/private/alltodos")
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }

    app.get("/api/private/alltodos")
        .await
        .assert_status(StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_public_group_is_limited_without_authentication() {
    let app = TestApp::new();
    let body = serde_json::json!({ "email": "user@example.com" });

    for _ in 0..5 {
        app.post("/api/public/forgotpassword")
            .json(&body)
            .await
            .assert_status_ok();
    }

    app.post("/api/public/forgotpassword")
        .json(&body)
        .await
        .assert_status(StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_operational_endpoints_are_not_limited() {
    let app = TestApp::new();

    for _ in 0..10 {
        let response = app.get("/health/live").await;
        response.assert_status_ok();
        assert!(!response.headers().contains_key("x-ratelimit-limit"));
    }
}
