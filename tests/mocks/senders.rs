//! Recording email and SMS senders

use std::sync::Mutex;

use async_trait::async_trait;
use gatehouse::dispatch::{EmailMessage, SmsMessage};
use gatehouse::error::DispatchError;
use gatehouse::{EmailSender, SmsSender};

/// Email sender that records every message
#[derive(Default)]
pub struct RecordingEmailSender {
    sent: Mutex<Vec<EmailMessage>>,
}

impl RecordingEmailSender {
    pub fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl EmailSender for RecordingEmailSender {
    async fn send(&self, message: &EmailMessage) -> Result<(), DispatchError> {
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

/// SMS sender that records every message
#[derive(Default)]
pub struct RecordingSmsSender {
    sent: Mutex<Vec<SmsMessage>>,
}

impl RecordingSmsSender {
    pub fn sent(&self) -> Vec<SmsMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl SmsSender for RecordingSmsSender {
    async fn send(&self, message: &SmsMessage) -> Result<String, DispatchError> {
        let mut sent = self.sent.lock().unwrap();
        sent.push(message.clone());
        Ok(format!("SM{}", sent.len()))
    }
}
