//! Health check endpoints
//!
//! - `/health` - status, Redis check and pipeline stats
//! - `/health/ready` - readiness probe
//! - `/health/live` - liveness probe

use std::sync::Arc;
use std::time::Instant;

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::AppState;

/// Health status enum
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

/// Individual dependency check result
#[derive(Debug, Serialize)]
pub struct DependencyCheck {
    pub status: HealthStatus,
    pub latency_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Dependency checks collection
#[derive(Debug, Serialize)]
pub struct DependencyChecks {
    /// Absent when the counter store is not Redis
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redis: Option<DependencyCheck>,
}

/// Application statistics
#[derive(Debug, Serialize)]
pub struct HealthStats {
    pub uptime_seconds: u64,
    pub rate_limit_backend: String,
    pub claims_cached: usize,
    pub dispatch_pending: usize,
}

/// Full health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub version: String,
    pub uptime_seconds: u64,
    pub timestamp: String,
    pub checks: DependencyChecks,
    pub stats: HealthStats,
}

/// Simple health response for liveness/readiness
#[derive(Debug, Serialize)]
pub struct SimpleHealthResponse {
    pub status: HealthStatus,
}

/// Check Redis connectivity, if Redis is in use
async fn check_redis(state: &AppState) -> Option<DependencyCheck> {
    let mut conn = state.redis.clone()?;
    let start = Instant::now();

    match redis::cmd("PING")
        .query_async::<_, String>(&mut conn)
        .await
    {
        Ok(_) => Some(DependencyCheck {
            status: HealthStatus::Healthy,
            latency_ms: start.elapsed().as_millis() as u64,
            error: None,
        }),
        Err(e) => Some(DependencyCheck {
            status: HealthStatus::Unhealthy,
            latency_ms: start.elapsed().as_millis() as u64,
            error: Some(e.to_string()),
        }),
    }
}

fn is_unhealthy(check: &Option<DependencyCheck>) -> bool {
    matches!(check, Some(c) if c.status == HealthStatus::Unhealthy)
}

/// Full health check endpoint
///
/// Reports version, uptime, the Redis check and pipeline stats.
pub async fn health_check(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<HealthResponse>) {
    let redis_check = check_redis(&state).await;

    let overall_status = match &redis_check {
        Some(check) => check.status.clone(),
        None => HealthStatus::Healthy,
    };

    let uptime = state.start_time.elapsed().as_secs();

    let response = HealthResponse {
        status: overall_status.clone(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: uptime,
        timestamp: chrono::Utc::now().to_rfc3339(),
        checks: DependencyChecks { redis: redis_check },
        stats: HealthStats {
            uptime_seconds: uptime,
            rate_limit_backend: state.config.rate_limit_backend.to_string(),
            claims_cached: state.token_validator.cache().len(),
            dispatch_pending: state.dispatch.pending(),
        },
    };

    let status_code = match overall_status {
        HealthStatus::Healthy => StatusCode::OK,
        HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(response))
}

/// Readiness probe endpoint
///
/// 503 while the Redis counter store is unreachable.
pub async fn readiness_check(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<SimpleHealthResponse>) {
    let redis_check = check_redis(&state).await;

    if is_unhealthy(&redis_check) {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(SimpleHealthResponse {
                status: HealthStatus::Unhealthy,
            }),
        );
    }

    (
        StatusCode::OK,
        Json(SimpleHealthResponse {
            status: HealthStatus::Healthy,
        }),
    )
}

/// Liveness probe endpoint
pub async fn liveness_check() -> (StatusCode, Json<SimpleHealthResponse>) {
    (
        StatusCode::OK,
        Json(SimpleHealthResponse {
            status: HealthStatus::Healthy,
        }),
    )
}
