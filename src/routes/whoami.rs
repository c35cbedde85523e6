//! Authenticated identity echo

use axum::{Extension, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::middleware::AuthenticatedUser;

#[derive(Debug, Serialize, Deserialize)]
pub struct WhoAmIResponse {
    pub subject_id: String,
    pub expires_at: DateTime<Utc>,
}

/// Return the subject of the validated bearer token
pub async fn whoami(Extension(user): Extension<AuthenticatedUser>) -> Json<WhoAmIResponse> {
    Json(WhoAmIResponse {
        subject_id: user.subject_id,
        expires_at: user.expires_at,
    })
}
