//! Operational endpoint tests
//!
//! - GET /health - status and pipeline stats
//! - GET /health/ready - readiness probe
//! - GET /health/live - liveness probe
//! - GET /metrics - Prometheus exposition

use pretty_assertions::assert_eq;
use serde_json::Value;

use crate::common::TestApp;

#[tokio::test]
async fn test_liveness() {
    let app = TestApp::new();

    let response = app.server.get("/health/live").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_readiness_without_redis() {
    let app = TestApp::new();

    app.server.get("/health/ready").await.assert_status_ok();
}

#[tokio::test]
async fn test_full_health_reports_pipeline_stats() {
    let app = TestApp::new();
    app.get_authed("/api/private/whoami").await.assert_status_ok();

    let response = app.server.get("/health").await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["stats"]["rate_limit_backend"], "memory");
    assert_eq!(body["stats"]["claims_cached"], 1);
    assert!(body["checks"].get("redis").is_none());
}

#[tokio::test]
async fn test_metrics_endpoint() {
    gatehouse::routes::metrics::init_metrics();
    let app = TestApp::new();

    app.get("/health/live").await;

    let response = app.server.get("/metrics").await;
    response.assert_status_ok();
}
