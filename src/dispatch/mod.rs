//! Asynchronous side-effect dispatch
//!
//! Three independent bounded queues (access log lines, email, SMS), each
//! drained by its own worker. Request handlers submit work and continue; a
//! full queue degrades to inline processing rather than dropping the task.

pub mod email;
pub mod log;
pub mod queue;
pub mod sms;
pub mod task;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::info;

use crate::config::Config;
use crate::error::DispatchError;

pub use email::{EmailHandler, EmailSender, SmtpEmailSender};
pub use log::LogLineHandler;
pub use queue::{BoundedTaskQueue, EnqueueOutcome, TaskHandler, TaskSummary};
pub use sms::{SmsHandler, SmsSender, TwilioSmsSender};
pub use task::{DispatchTask, EmailMessage, LogLine, SmsMessage};

/// Stand-in transport for a channel with no configured backend
#[derive(Debug, Clone, Copy)]
pub struct Unconfigured;

#[async_trait]
impl EmailSender for Unconfigured {
    async fn send(&self, _message: &EmailMessage) -> Result<(), DispatchError> {
        Err(DispatchError::BackendUnavailable(
            "SMTP is not configured".to_string(),
        ))
    }
}

#[async_trait]
impl SmsSender for Unconfigured {
    async fn send(&self, _message: &SmsMessage) -> Result<String, DispatchError> {
        Err(DispatchError::BackendUnavailable(
            "Twilio is not configured".to_string(),
        ))
    }
}

/// Owner of the log, email and SMS queues
pub struct Dispatcher {
    logs: BoundedTaskQueue<LogLine>,
    email: BoundedTaskQueue<EmailMessage>,
    sms: BoundedTaskQueue<SmsMessage>,
}

impl Dispatcher {
    /// Build the queues with the given transports. Workers are not started.
    pub fn new(
        config: &Config,
        email_sender: Arc<dyn EmailSender>,
        sms_sender: Arc<dyn SmsSender>,
    ) -> Self {
        Self::with_capacities(
            config.log_queue_capacity,
            config.email_queue_capacity,
            config.sms_queue_capacity,
            email_sender,
            sms_sender,
        )
    }

    pub fn with_capacities(
        log_capacity: usize,
        email_capacity: usize,
        sms_capacity: usize,
        email_sender: Arc<dyn EmailSender>,
        sms_sender: Arc<dyn SmsSender>,
    ) -> Self {
        Self {
            logs: BoundedTaskQueue::new("log", log_capacity, Arc::new(LogLineHandler)),
            email: BoundedTaskQueue::new(
                "email",
                email_capacity,
                Arc::new(EmailHandler::new(email_sender)),
            ),
            sms: BoundedTaskQueue::new("sms", sms_capacity, Arc::new(SmsHandler::new(sms_sender))),
        }
    }

    /// Spawn the three workers
    pub fn start(&self) {
        self.logs.start();
        self.email.start();
        self.sms.start();
    }

    /// Route a task to its queue
    pub async fn submit(&self, task: DispatchTask) -> EnqueueOutcome {
        match task {
            DispatchTask::LogLine(line) => self.logs.enqueue(line).await,
            DispatchTask::Email(message) => self.email.enqueue(message).await,
            DispatchTask::Sms(message) => self.sms.enqueue(message).await,
        }
    }

    pub async fn log_line(&self, line: impl Into<String>) -> EnqueueOutcome {
        self.logs.enqueue(LogLine(line.into())).await
    }

    pub async fn queue_email(&self, message: EmailMessage) -> EnqueueOutcome {
        self.email.enqueue(message).await
    }

    pub async fn queue_sms(&self, message: SmsMessage) -> EnqueueOutcome {
        self.sms.enqueue(message).await
    }

    /// Tasks currently buffered across all queues
    pub fn pending(&self) -> usize {
        self.logs.pending() + self.email.pending() + self.sms.pending()
    }

    /// Close all queues and drain them concurrently, each bounded by `timeout`.
    ///
    /// Returns `true` only if every queue drained.
    pub async fn shutdown(&self, timeout: Duration) -> bool {
        info!(
            timeout_secs = timeout.as_secs(),
            pending = self.pending(),
            "Draining dispatch queues"
        );
        let (logs, email, sms) = futures::join!(
            self.logs.shutdown(timeout),
            self.email.shutdown(timeout),
            self.sms.shutdown(timeout),
        );
        logs && email && sms
    }
}
