//! Signed identity tokens
//!
//! Tokens are HS256 JWTs whose payload carries the subject (`id`) and an
//! expiry (`exp`, unix seconds). The signing secret is loaded once at startup.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::AuthError;

/// Decoded, verified identity carried by a token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityClaim {
    pub subject_id: String,
    pub expires_at: DateTime<Utc>,
}

impl IdentityClaim {
    /// Whether the claim is still valid at `now`
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}

/// Wire payload of a token
#[derive(Debug, Serialize, Deserialize)]
struct TokenClaims {
    #[serde(alias = "sub")]
    id: String,
    exp: i64,
}

/// Full (cryptographic) token verification
///
/// Implementations check the signature and decode the claims. The caller
/// supplies the clock reading used for the expiry check.
pub trait TokenVerifier: Send + Sync {
    fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<IdentityClaim, AuthError>;
}

/// HMAC-SHA256 token signer and verifier over a shared secret
pub struct JwtCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtCodec {
    /// Create a codec for the given shared secret
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is compared against the caller's clock in `verify`
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// Issue a token for `subject` valid for `ttl` from now
    pub fn issue(&self, subject: &str, ttl: Duration) -> jsonwebtoken::errors::Result<String> {
        self.issue_until(subject, Utc::now() + ttl)
    }

    /// Issue a token for `subject` that expires at `expires_at`
    pub fn issue_until(
        &self,
        subject: &str,
        expires_at: DateTime<Utc>,
    ) -> jsonwebtoken::errors::Result<String> {
        let claims = TokenClaims {
            id: subject.to_string(),
            exp: expires_at.timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
    }
}

impl TokenVerifier for JwtCodec {
    fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<IdentityClaim, AuthError> {
        let data = decode::<TokenClaims>(token, &self.decoding_key, &self.validation)
            .map_err(|_| AuthError::InvalidSignature)?;

        if data.claims.id.is_empty() {
            return Err(AuthError::InvalidSignature);
        }

        let expires_at =
            DateTime::from_timestamp(data.claims.exp, 0).ok_or(AuthError::InvalidSignature)?;

        let claim = IdentityClaim {
            subject_id: data.claims.id,
            expires_at,
        };

        if !claim.is_valid_at(now) {
            return Err(AuthError::Expired);
        }

        Ok(claim)
    }
}

/// Short, non-reversible token fingerprint for log fields
pub fn fingerprint(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    hex::encode(&digest[..8])
}
