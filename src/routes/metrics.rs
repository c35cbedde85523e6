//! Prometheus metrics endpoint
//!
//! Exposes pipeline metrics in Prometheus format for monitoring.

use axum::response::IntoResponse;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::Lazy;

/// Global Prometheus handle for metrics export
static PROMETHEUS_HANDLE: Lazy<PrometheusHandle> = Lazy::new(|| {
    PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus recorder")
});

/// Initialize metrics (call once at startup)
pub fn init_metrics() {
    let _ = &*PROMETHEUS_HANDLE;
    register_metrics();
}

fn register_metrics() {
    metrics::describe_counter!(
        "gatehouse_requests_total",
        "Total number of requests passing the pipeline"
    );
    metrics::describe_histogram!(
        "gatehouse_request_duration_seconds",
        "Request duration in seconds"
    );
    metrics::describe_counter!(
        "gatehouse_auth_total",
        "Bearer token authentication outcomes"
    );
    metrics::describe_counter!(
        "gatehouse_rate_limit_total",
        "Rate limit decisions per limiter group"
    );
    metrics::describe_counter!(
        "gatehouse_dispatch_total",
        "Side-effect task outcomes per queue"
    );
}

/// Prometheus metrics endpoint handler
pub async fn prometheus_metrics() -> impl IntoResponse {
    PROMETHEUS_HANDLE.render()
}

/// Record a completed request
pub fn record_request(method: &str, status: u16, duration_secs: f64) {
    metrics::counter!(
        "gatehouse_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("gatehouse_request_duration_seconds", "method" => method.to_string())
        .record(duration_secs);
}

/// Record an authentication outcome (`ok`, `cached` or an error code)
pub fn record_auth(result: &str) {
    metrics::counter!("gatehouse_auth_total", "result" => result.to_string()).increment(1);
}

/// Record a rate limit decision (`allowed`, `denied`, `unavailable`)
pub fn record_rate_limit(group: &str, result: &str) {
    metrics::counter!(
        "gatehouse_rate_limit_total",
        "group" => group.to_string(),
        "result" => result.to_string()
    )
    .increment(1);
}

/// Record a dispatch outcome (`queued`, `inline`, `ok`, `failed`, `panicked`)
pub fn record_dispatch(queue: &str, outcome: &str) {
    metrics::counter!(
        "gatehouse_dispatch_total",
        "queue" => queue.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}
