//! Error types for Gatehouse
//!
//! This module defines the error taxonomy of the middleware layer and how
//! each error maps onto an HTTP response.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ratelimit::RateLimitDecision;

/// Bearer token authentication failures
///
/// All of these are expected, client-driven outcomes.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("No token provided")]
    NoToken,

    #[error("Authorization header must be of the form 'Bearer <token>'")]
    MalformedHeader,

    #[error("Invalid token signature or claims")]
    InvalidSignature,

    #[error("Token has expired")]
    Expired,
}

impl AuthError {
    /// Machine-readable reason code
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::NoToken => "NO_TOKEN",
            AuthError::MalformedHeader => "MALFORMED_HEADER",
            AuthError::InvalidSignature => "INVALID_SIGNATURE",
            AuthError::Expired => "TOKEN_EXPIRED",
        }
    }
}

/// Rate limiting failures
#[derive(Debug, Clone, Error)]
pub enum RateLimitError {
    #[error("Rate limit exceeded")]
    LimitExceeded(RateLimitDecision),

    #[error("Rate limit store unavailable: {0}")]
    StoreUnavailable(String),
}

impl From<redis::RedisError> for RateLimitError {
    fn from(err: redis::RedisError) -> Self {
        RateLimitError::StoreUnavailable(err.to_string())
    }
}

/// Side-effect dispatch failures
///
/// Never surfaced to a caller; logged by the owning queue worker.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Transport failure: {0}")]
    TransportFailure(String),

    #[error("Invalid message: {0}")]
    InvalidMessage(String),
}

/// Application-level errors
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    RateLimit(#[from] RateLimitError),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Error response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

/// Error details
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<ErrorDetails>,
}

/// Additional error details for rate limiting
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub used: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reset_at: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = match &self {
            AppError::Auth(err) => (
                StatusCode::UNAUTHORIZED,
                err.code(),
                err.to_string(),
                None,
            ),
            AppError::RateLimit(RateLimitError::LimitExceeded(decision)) => {
                return crate::middleware::rate_limiter::rate_limit_exceeded_response(decision);
            }
            AppError::RateLimit(RateLimitError::StoreUnavailable(_)) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "RATE_LIMIT_UNAVAILABLE",
                "Rate limit service error".to_string(),
                None,
            ),
            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "Internal server error".to_string(),
                None,
            ),
        };

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message,
                details,
            },
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for convenience
pub type AppResult<T> = Result<T, AppError>;
