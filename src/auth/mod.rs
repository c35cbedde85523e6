//! Bearer token authentication
//!
//! Token signing/verification, the claims cache and the validator that ties
//! them together.

pub mod cache;
pub mod token;
pub mod validator;

pub use cache::ClaimsCache;
pub use token::{IdentityClaim, JwtCodec, TokenVerifier};
pub use validator::TokenValidator;
