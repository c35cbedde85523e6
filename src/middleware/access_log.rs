//! Access log middleware
//!
//! Times each request and hands one formatted line to the log queue once the
//! response is ready. Writing the line never delays the response beyond the
//! queue's capacity check.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};

use super::client_ip::client_address;
use crate::{routes::metrics, AppState};

/// Format one access log line:
/// `METHOD path | status | duration | client | user agent`
pub fn format_access_line(
    method: &str,
    path: &str,
    status: u16,
    elapsed: Duration,
    client: &str,
    user_agent: &str,
) -> String {
    format!(
        "{} {} | {} | {}ms | {} | {}",
        method,
        path,
        status,
        elapsed.as_millis(),
        client,
        user_agent
    )
}

/// Access log middleware
pub async fn access_log_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let client = client_address(&request, state.config.trust_proxy_headers);
    let user_agent = request
        .headers()
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
        .to_string();

    let response = next.run(request).await;

    let elapsed = start.elapsed();
    let status = response.status().as_u16();
    metrics::record_request(&method, status, elapsed.as_secs_f64());

    state
        .dispatch
        .log_line(format_access_line(
            &method,
            &path,
            status,
            elapsed,
            &client,
            &user_agent,
        ))
        .await;

    response
}
