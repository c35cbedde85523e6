//! Rate limiting middleware
//!
//! Counts every request against `(client address, route, group)` before any
//! other work is done for it.

use std::sync::Arc;

use axum::{
    extract::{MatchedPath, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use tracing::{error, warn};

use super::client_ip::client_address;
use crate::{
    error::{AppError, ErrorBody, ErrorDetails, ErrorResponse, RateLimitError},
    ratelimit::{LimiterGroup, RateKey, RateLimitDecision},
    routes::metrics,
    AppState,
};

/// Route identifier used in the rate key: the matched route template, or the
/// raw path when no route matched.
pub fn route_identifier(request: &Request) -> String {
    request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string())
}

/// Build a 429 Too Many Requests response with rate limit headers
pub fn rate_limit_exceeded_response(decision: &RateLimitDecision) -> Response {
    let error_response = ErrorResponse {
        error: ErrorBody {
            code: "RATE_LIMIT_EXCEEDED".to_string(),
            message: "Too many requests. Please slow down.".to_string(),
            details: Some(ErrorDetails {
                limit: Some(decision.limit),
                used: Some(decision.current),
                remaining: Some(decision.remaining.max(0)),
                reset_at: Some(
                    chrono::DateTime::from_timestamp(decision.reset_at, 0)
                        .map(|dt| dt.to_rfc3339())
                        .unwrap_or_else(|| decision.reset_at.to_string()),
                ),
            }),
        },
    };

    let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(error_response)).into_response();

    let headers = response.headers_mut();
    for (name, value) in decision.headers() {
        headers.insert(name, value);
    }

    response
}

/// Rate limiting middleware
///
/// State is the shared app state plus the group whose policy applies.
/// Returns 429 when the quota is exhausted and 500 when the counter store is
/// unavailable (unless fail-open is configured). Allowed responses carry the
/// `x-ratelimit-*` headers.
pub async fn rate_limit_middleware(
    State((state, group)): State<(Arc<AppState>, LimiterGroup)>,
    request: Request,
    next: Next,
) -> Response {
    let key = RateKey::new(
        client_address(&request, state.config.trust_proxy_headers),
        route_identifier(&request),
        group,
    );

    match state.rate_limiters.for_group(group).check(&key).await {
        Ok(decision) if decision.allowed => {
            metrics::record_rate_limit(group.as_str(), "allowed");

            let mut response = next.run(request).await;
            let headers = response.headers_mut();
            for (name, value) in decision.headers() {
                headers.insert(name, value);
            }
            response
        }
        Ok(decision) => {
            warn!(
                group = %group,
                client = %key.client_address,
                route = %key.route,
                limit = decision.limit,
                current = decision.current,
                "Rate limit exceeded"
            );
            metrics::record_rate_limit(group.as_str(), "denied");
            AppError::RateLimit(RateLimitError::LimitExceeded(decision)).into_response()
        }
        Err(e) => {
            metrics::record_rate_limit(group.as_str(), "unavailable");
            if state.config.rate_limit_fail_open {
                error!(error = %e, key = %key, "Rate limit check failed, allowing request");
                next.run(request).await
            } else {
                error!(error = %e, key = %key, "Rate limit check failed, rejecting request");
                AppError::RateLimit(e).into_response()
            }
        }
    }
}
