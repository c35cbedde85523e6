//! Handlers enqueueing side effects through the dispatcher

use std::time::Duration;

use axum::http::StatusCode;
use pretty_assertions::assert_eq;

use crate::common::TestApp;

#[tokio::test]
async fn test_handler_email_is_delivered_after_response() {
    let app = TestApp::new();

    app.post("/api/public/forgotpassword")
        .json(&serde_json::json!({ "email": "user@example.com" }))
        .await
        .assert_status_ok();

    assert!(app.state.dispatch.shutdown(Duration::from_secs(5)).await);

    let sent = app.email.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "user@example.com");
    assert_eq!(sent[0].subject, "New Password");
}

#[tokio::test]
async fn test_handler_sms_is_delivered() {
    let app = TestApp::new();

    app.post("/api/public/phoneverify")
        .json(&serde_json::json!({ "phone": "+15550100" }))
        .await
        .assert_status(StatusCode::ACCEPTED);

    assert!(app.state.dispatch.shutdown(Duration::from_secs(5)).await);

    let sent = app.sms.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "+15550100");
}

#[tokio::test]
async fn test_requests_after_shutdown_still_deliver_inline() {
    let app = TestApp::new();
    assert!(app.state.dispatch.shutdown(Duration::from_secs(5)).await);

    app.post("/api/public/forgotpassword")
        .json(&serde_json::json!({ "email": "late@example.com" }))
        .await
        .assert_status_ok();

    // Inline delivery completes before the handler returns
    assert_eq!(app.email.sent().len(), 1);
}
