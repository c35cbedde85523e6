//! Test doubles for the pipeline's external collaborators
//!
//! - Outbound email and SMS senders that record what they were asked to send
//! - Counter stores that fail or hang
//! - Redis connection helper that skips when no server is running

pub mod redis;
pub mod senders;
pub mod stores;

pub use self::redis::*;
pub use senders::*;
pub use stores::*;
