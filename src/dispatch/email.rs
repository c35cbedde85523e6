//! Outbound email over SMTP

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox, MultiPart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::info;

use super::queue::TaskHandler;
use super::task::EmailMessage;
use crate::config::SmtpConfig;
use crate::error::DispatchError;

/// Email sender abstraction
#[async_trait]
pub trait EmailSender: Send + Sync {
    /// Send one message
    async fn send(&self, message: &EmailMessage) -> Result<(), DispatchError>;
}

/// SMTP-based email sender
pub struct SmtpEmailSender {
    default_from: String,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpEmailSender {
    /// Create a sender from SMTP settings.
    ///
    /// Port 465 uses implicit TLS; any other port negotiates STARTTLS.
    pub fn new(config: &SmtpConfig) -> Result<Self> {
        let builder = if config.port == 465 {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
        }
        .context("Failed to create SMTP transport")?;

        let transport = builder
            .port(config.port)
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .build();

        Ok(Self {
            default_from: config.default_from.clone(),
            transport,
        })
    }
}

#[async_trait]
impl EmailSender for SmtpEmailSender {
    async fn send(&self, message: &EmailMessage) -> Result<(), DispatchError> {
        let email = build_message(message, &self.default_from)?;
        self.transport
            .send(email)
            .await
            .map_err(|e| DispatchError::TransportFailure(format!("SMTP send failed: {}", e)))?;
        Ok(())
    }
}

/// Build a MIME message, falling back to `default_from` for an empty sender
pub fn build_message(message: &EmailMessage, default_from: &str) -> Result<Message, DispatchError> {
    let from = if message.from.is_empty() {
        default_from
    } else {
        &message.from
    };

    let from: Mailbox = from
        .parse()
        .map_err(|e| DispatchError::InvalidMessage(format!("Invalid sender address: {}", e)))?;
    let to: Mailbox = message
        .to
        .parse()
        .map_err(|e| DispatchError::InvalidMessage(format!("Invalid recipient address: {}", e)))?;

    let builder = Message::builder()
        .from(from)
        .to(to)
        .subject(message.subject.clone());

    let built = match (message.text.is_empty(), message.html.is_empty()) {
        (false, false) => builder.multipart(MultiPart::alternative_plain_html(
            message.text.clone(),
            message.html.clone(),
        )),
        (false, true) => builder
            .header(ContentType::TEXT_PLAIN)
            .body(message.text.clone()),
        (true, false) => builder
            .header(ContentType::TEXT_HTML)
            .body(message.html.clone()),
        (true, true) => {
            return Err(DispatchError::InvalidMessage(
                "Email has neither text nor html body".to_string(),
            ))
        }
    };

    built.map_err(|e| DispatchError::InvalidMessage(e.to_string()))
}

/// Queue handler delivering [`EmailMessage`]s
pub struct EmailHandler {
    sender: Arc<dyn EmailSender>,
}

impl EmailHandler {
    pub fn new(sender: Arc<dyn EmailSender>) -> Self {
        Self { sender }
    }
}

#[async_trait]
impl TaskHandler<EmailMessage> for EmailHandler {
    async fn handle(&self, task: &EmailMessage) -> Result<(), DispatchError> {
        self.sender.send(task).await?;
        info!(to = %task.to, "Email sent");
        Ok(())
    }
}
