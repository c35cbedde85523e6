//! Side-effect tasks handed to the dispatch queues

use serde::{Deserialize, Serialize};

use super::queue::TaskSummary;

/// A formatted audit/access log line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogLine(pub String);

impl From<String> for LogLine {
    fn from(line: String) -> Self {
        LogLine(line)
    }
}

/// Outbound email
///
/// An empty `from` is replaced by the configured default sender. At least one
/// of `text` and `html` should be non-empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: String,
}

/// Outbound SMS
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmsMessage {
    pub to: String,
    pub body: String,
}

/// Any side effect a handler can produce
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "task", rename_all = "snake_case")]
pub enum DispatchTask {
    LogLine(LogLine),
    Email(EmailMessage),
    Sms(SmsMessage),
}

const LOG_SUMMARY_CHARS: usize = 80;

impl TaskSummary for LogLine {
    fn summary(&self) -> String {
        let mut summary: String = self.0.chars().take(LOG_SUMMARY_CHARS).collect();
        if self.0.chars().count() > LOG_SUMMARY_CHARS {
            summary.push_str("...");
        }
        format!("log line \"{}\"", summary)
    }
}

impl TaskSummary for EmailMessage {
    fn summary(&self) -> String {
        format!("email to={} subject={:?}", self.to, self.subject)
    }
}

impl TaskSummary for SmsMessage {
    fn summary(&self) -> String {
        format!("sms to={}", self.to)
    }
}

impl TaskSummary for DispatchTask {
    fn summary(&self) -> String {
        match self {
            DispatchTask::LogLine(line) => line.summary(),
            DispatchTask::Email(email) => email.summary(),
            DispatchTask::Sms(sms) => sms.summary(),
        }
    }
}
