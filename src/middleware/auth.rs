//! Authentication middleware
//!
//! Validates bearer tokens through the shared [`TokenValidator`] and exposes
//! the caller's identity to handlers.
//!
//! [`TokenValidator`]: crate::auth::TokenValidator

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use chrono::{DateTime, Utc};
use tracing::{debug, instrument};

use crate::{
    error::{AppError, AuthError},
    routes::metrics,
    AppState,
};

/// Identity of the authenticated caller
///
/// Inserted into request extensions; read it with `Extension<AuthenticatedUser>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub subject_id: String,
    pub expires_at: DateTime<Utc>,
}

/// Authentication middleware
///
/// Rejects the request with 401 unless the `Authorization` header carries a
/// valid, unexpired bearer token.
#[instrument(skip_all, fields(path = %request.uri().path()))]
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let raw_header = match request.headers().get(header::AUTHORIZATION) {
        Some(value) => Some(value.to_str().map_err(|_| reject(AuthError::MalformedHeader))?),
        None => None,
    };

    let claim = state
        .token_validator
        .authenticate(raw_header)
        .map_err(reject)?;

    debug!(subject_id = %claim.subject_id, "User authenticated");
    metrics::record_auth("ok");

    request.extensions_mut().insert(AuthenticatedUser {
        subject_id: claim.subject_id,
        expires_at: claim.expires_at,
    });

    Ok(next.run(request).await)
}

fn reject(err: AuthError) -> AppError {
    debug!(code = err.code(), "Authentication rejected");
    metrics::record_auth(err.code());
    AppError::Auth(err)
}
