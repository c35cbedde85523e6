//! Integration tests for the Gatehouse pipeline

mod dispatch;
mod health;
mod pipeline;
mod store_failure;
