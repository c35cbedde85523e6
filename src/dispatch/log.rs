//! Access log sink

use async_trait::async_trait;
use tracing::info;

use super::queue::TaskHandler;
use super::task::LogLine;
use crate::error::DispatchError;

/// Writes each [`LogLine`] to the `gatehouse::access` tracing target
#[derive(Debug, Default, Clone, Copy)]
pub struct LogLineHandler;

#[async_trait]
impl TaskHandler<LogLine> for LogLineHandler {
    async fn handle(&self, task: &LogLine) -> Result<(), DispatchError> {
        info!(target: "gatehouse::access", "{}", task.0);
        Ok(())
    }
}
