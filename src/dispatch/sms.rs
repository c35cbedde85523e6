//! Outbound SMS via the Twilio REST API

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::info;

use super::queue::TaskHandler;
use super::task::SmsMessage;
use crate::config::TwilioConfig;
use crate::error::DispatchError;

/// SMS sender abstraction
#[async_trait]
pub trait SmsSender: Send + Sync {
    /// Send one message, returning the provider's message id
    async fn send(&self, message: &SmsMessage) -> Result<String, DispatchError>;
}

#[derive(Debug, Deserialize)]
struct MessageResource {
    sid: String,
}

/// Twilio Messages API client
pub struct TwilioSmsSender {
    client: Client,
    messages_url: String,
    account_sid: String,
    auth_token: String,
    from_number: String,
}

impl TwilioSmsSender {
    pub fn new(config: &TwilioConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            messages_url: format!(
                "{}/2010-04-01/Accounts/{}/Messages.json",
                config.api_url.trim_end_matches('/'),
                config.account_sid
            ),
            account_sid: config.account_sid.clone(),
            auth_token: config.auth_token.clone(),
            from_number: config.from_number.clone(),
        })
    }
}

#[async_trait]
impl SmsSender for TwilioSmsSender {
    async fn send(&self, message: &SmsMessage) -> Result<String, DispatchError> {
        if message.to.is_empty() {
            return Err(DispatchError::InvalidMessage("SMS has no recipient".to_string()));
        }

        let form = [
            ("To", message.to.as_str()),
            ("From", self.from_number.as_str()),
            ("Body", message.body.as_str()),
        ];

        let response = self
            .client
            .post(&self.messages_url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&form)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() || e.is_timeout() {
                    DispatchError::BackendUnavailable(format!("Twilio unreachable: {}", e))
                } else {
                    DispatchError::TransportFailure(format!("Twilio request failed: {}", e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DispatchError::TransportFailure(format!(
                "Twilio returned {}: {}",
                status, body
            )));
        }

        let resource: MessageResource = response.json().await.map_err(|e| {
            DispatchError::TransportFailure(format!("Invalid Twilio response: {}", e))
        })?;

        Ok(resource.sid)
    }
}

/// Queue handler delivering [`SmsMessage`]s
pub struct SmsHandler {
    sender: Arc<dyn SmsSender>,
}

impl SmsHandler {
    pub fn new(sender: Arc<dyn SmsSender>) -> Self {
        Self { sender }
    }
}

#[async_trait]
impl TaskHandler<SmsMessage> for SmsHandler {
    async fn handle(&self, task: &SmsMessage) -> Result<(), DispatchError> {
        let sid = self.sender.send(task).await?;
        info!(to = %task.to, sid = %sid, "SMS sent");
        Ok(())
    }
}
