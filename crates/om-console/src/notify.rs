//! Broadcast bus for action outcomes, the console's snackbar.

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub severity: Severity,
    pub title: String,
    pub message: Option<String>,
    pub at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct Notifier {
    tx: broadcast::Sender<Notification>,
}

impl Notifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.tx.subscribe()
    }

    pub fn success(&self, title: impl Into<String>) {
        self.publish(Severity::Success, title.into(), None);
    }

    pub fn error(&self, title: impl Into<String>, message: impl Into<String>) {
        self.publish(Severity::Error, title.into(), Some(message.into()));
    }

    fn publish(&self, severity: Severity, title: String, message: Option<String>) {
        // No subscribers is fine.
        let _ = self.tx.send(Notification {
            severity,
            title,
            message,
            at: Utc::now(),
        });
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new(256)
    }
}
