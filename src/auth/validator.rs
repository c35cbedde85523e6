//! Token validation with a claims cache in front of verification

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use super::cache::ClaimsCache;
use super::token::{fingerprint, IdentityClaim, TokenVerifier};
use crate::error::AuthError;

/// Extract the token from an `Authorization: Bearer <token>` header value
pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    let token = auth_header.strip_prefix("Bearer ")?.trim();
    if token.is_empty() || token.contains(char::is_whitespace) {
        None
    } else {
        Some(token)
    }
}

/// Resolves bearer tokens to identities
///
/// A token seen before and still within its validity window is answered from
/// the cache without repeating signature verification.
pub struct TokenValidator {
    verifier: Arc<dyn TokenVerifier>,
    cache: ClaimsCache,
}

impl TokenValidator {
    /// Create a validator over the given verifier and cache
    pub fn new(verifier: Arc<dyn TokenVerifier>, cache: ClaimsCache) -> Self {
        Self { verifier, cache }
    }

    /// Authenticate a raw `Authorization` header value
    pub fn authenticate(&self, raw_header: Option<&str>) -> Result<IdentityClaim, AuthError> {
        self.authenticate_at(raw_header, Utc::now())
    }

    /// Authenticate against an explicit clock reading
    pub fn authenticate_at(
        &self,
        raw_header: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<IdentityClaim, AuthError> {
        let header = raw_header
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .ok_or(AuthError::NoToken)?;

        let token = extract_bearer_token(header).ok_or(AuthError::MalformedHeader)?;

        if let Some(claim) = self.cache.get(token, now) {
            debug!(token = %fingerprint(token), subject = %claim.subject_id, "Claims cache hit");
            return Ok(claim);
        }

        let claim = self.verifier.verify(token, now)?;
        self.cache.insert(token, claim.clone(), now);

        debug!(token = %fingerprint(token), subject = %claim.subject_id, "Token verified and cached");
        Ok(claim)
    }

    /// The underlying cache
    pub fn cache(&self) -> &ClaimsCache {
        &self.cache
    }
}
