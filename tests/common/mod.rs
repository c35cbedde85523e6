//! Common test utilities for Gatehouse
//!
//! Builds a full router over the in-memory fixed-window limiter driven by a
//! manual clock, with recording email and SMS senders and a small set of
//! application routes standing in for the real handlers.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, State},
    http::{HeaderName, HeaderValue, StatusCode},
    routing::{get, post},
    Extension, Json, Router,
};
use axum_test::{TestRequest, TestServer};
use serde::Deserialize;
use serde_json::{json, Value};

use gatehouse::config::RateLimitBackend;
use gatehouse::dispatch::{EmailMessage, SmsMessage};
use gatehouse::ratelimit::{
    CounterStore, FixedWindowLimiter, InMemoryCounterStore, LimiterGroup, ManualClock,
    RateLimitPolicy,
};
use gatehouse::{create_router, AppState, AuthenticatedUser, Config, RateLimiters};

use crate::mocks::{RecordingEmailSender, RecordingSmsSender};

/// Test configuration constants
pub mod constants {
    pub const TEST_JWT_KEY: &str = "test-signing-secret";
    pub const TEST_CLIENT_IP: &str = "1.2.3.4";
    pub const TEST_SUBJECT: &str = "user_123";
}

/// Configuration mirroring production defaults, with proxy headers trusted
/// so tests can pick the client address
pub fn test_config() -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        redis_url: "redis://127.0.0.1:6379".to_string(),
        jwt_key: constants::TEST_JWT_KEY.to_string(),
        claims_cache_max_entries: 100,
        rate_limit_backend: RateLimitBackend::Memory,
        public_rate_limit: RateLimitPolicy::default(),
        private_rate_limit: RateLimitPolicy::default(),
        rate_limit_store_timeout: Duration::from_millis(250),
        rate_limit_fail_open: false,
        trust_proxy_headers: true,
        log_queue_capacity: 100,
        email_queue_capacity: 100,
        sms_queue_capacity: 100,
        shutdown_drain_timeout: Duration::from_secs(5),
        smtp: None,
        twilio: None,
    }
}

/// A running test application
pub struct TestApp {
    pub server: TestServer,
    pub state: Arc<AppState>,
    pub clock: ManualClock,
    pub email: Arc<RecordingEmailSender>,
    pub sms: Arc<RecordingSmsSender>,
}

impl TestApp {
    /// Application over an in-memory counter store and a manual clock
    pub fn new() -> Self {
        let clock = ManualClock::new();
        let store = Arc::new(InMemoryCounterStore::with_clock(clock.clone()));
        Self::with_store(test_config(), store, clock)
    }

    /// Application over an arbitrary counter store
    pub fn with_store(config: Config, store: Arc<dyn CounterStore>, clock: ManualClock) -> Self {
        let limiter = |group| -> Arc<dyn gatehouse::RateLimiter> {
            Arc::new(FixedWindowLimiter::new(
                store.clone(),
                config.rate_limit_policy(group),
                config.rate_limit_store_timeout,
            ))
        };
        let limiters = RateLimiters::new(limiter(LimiterGroup::Public), limiter(LimiterGroup::Private));

        let email = Arc::new(RecordingEmailSender::default());
        let sms = Arc::new(RecordingSmsSender::default());

        let state = Arc::new(AppState::with_services(
            config,
            None,
            limiters,
            email.clone(),
            sms.clone(),
        ));

        let app = create_router(state.clone(), public_routes(), private_routes());
        let server = TestServer::new(app).expect("Failed to create test server");

        Self {
            server,
            state,
            clock,
            email,
            sms,
        }
    }

    /// Signed token for the test subject, valid for 30 days
    pub fn token(&self) -> String {
        self.state
            .jwt
            .issue(constants::TEST_SUBJECT, chrono::Duration::days(30))
            .expect("Failed to issue token")
    }

    /// GET from the test client address
    pub fn get(&self, path: &str) -> TestRequest {
        from_client(self.server.get(path))
    }

    /// POST from the test client address
    pub fn post(&self, path: &str) -> TestRequest {
        from_client(self.server.post(path))
    }

    /// Authenticated GET from the test client address
    pub fn get_authed(&self, path: &str) -> TestRequest {
        with_bearer(self.get(path), &self.token())
    }
}

fn from_client(request: TestRequest) -> TestRequest {
    request.add_header(
        HeaderName::from_static("x-forwarded-for"),
        HeaderValue::from_static(constants::TEST_CLIENT_IP),
    )
}

/// Attach `Authorization: Bearer <token>`
pub fn with_bearer(request: TestRequest, token: &str) -> TestRequest {
    with_authorization(request, &format!("Bearer {}", token))
}

/// Attach a raw `Authorization` header value
pub fn with_authorization(request: TestRequest, value: &str) -> TestRequest {
    request.add_header(
        axum::http::header::AUTHORIZATION,
        HeaderValue::from_str(value).expect("Invalid header value"),
    )
}

#[derive(Debug, Deserialize)]
struct ForgotPasswordRequest {
    email: String,
}

#[derive(Debug, Deserialize)]
struct PhoneVerifyRequest {
    phone: String,
}

/// Stand-ins for the application's public handlers
fn public_routes() -> Router<Arc<AppState>> {
    async fn forgot_password(
        State(state): State<Arc<AppState>>,
        Json(body): Json<ForgotPasswordRequest>,
    ) -> StatusCode {
        state
            .dispatch
            .queue_email(EmailMessage {
                to: body.email,
                subject: "New Password".to_string(),
                text: "Your new password is: hunter2".to_string(),
                ..Default::default()
            })
            .await;
        StatusCode::OK
    }

    async fn phone_verify(
        State(state): State<Arc<AppState>>,
        Json(body): Json<PhoneVerifyRequest>,
    ) -> StatusCode {
        state
            .dispatch
            .queue_sms(SmsMessage {
                to: body.phone,
                body: "Your code is 1234".to_string(),
            })
            .await;
        StatusCode::ACCEPTED
    }

    Router::new()
        .route("/forgotpassword", post(forgot_password))
        .route("/phoneverify", post(phone_verify))
}

/// Stand-ins for the application's private handlers
fn private_routes() -> Router<Arc<AppState>> {
    async fn all_todos(Extension(user): Extension<AuthenticatedUser>) -> Json<Value> {
        Json(json!({ "owner": user.subject_id, "todos": [] }))
    }

    async fn get_one(
        Extension(user): Extension<AuthenticatedUser>,
        Path(id): Path<String>,
    ) -> Json<Value> {
        Json(json!({ "owner": user.subject_id, "id": id }))
    }

    Router::new()
        .route("/alltodos", get(all_todos))
        .route("/addtodo", post(|| async { StatusCode::CREATED }))
        .route("/getone/:id", get(get_one))
}
