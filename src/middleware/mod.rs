//! Middleware module
//!
//! The request pipeline: access logging, rate limiting and bearer token
//! authentication, each an axum `from_fn_with_state` layer.

pub mod access_log;
pub mod auth;
pub mod client_ip;
pub mod rate_limiter;

pub use auth::AuthenticatedUser;
