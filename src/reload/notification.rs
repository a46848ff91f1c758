//! User-facing notifications.

use parking_lot::Mutex;
use serde::Serialize;

use crate::logger::{status_error, status_info, status_success, status_warning};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Info,
    Success,
    Warning,
    Error,
}

/// Where notifications are rendered.
pub trait NotificationSink: Send + Sync + 'static {
    fn show(&self, kind: NotificationKind, message: &str, details: Option<&str>, auto_dismiss: bool);
}

/// Renders notifications as timestamped terminal status lines.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl NotificationSink for LogSink {
    fn show(&self, kind: NotificationKind, message: &str, details: Option<&str>, auto_dismiss: bool) {
        let details = details.unwrap_or_default();
        match kind {
            NotificationKind::Info => status_info(message, auto_dismiss),
            NotificationKind::Success => status_success(message, auto_dismiss),
            NotificationKind::Warning => status_warning(message, details, auto_dismiss),
            NotificationKind::Error => status_error(message, details, auto_dismiss),
        }
    }
}

/// One recorded notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub message: String,
    pub details: Option<String>,
    pub auto_dismiss: bool,
}

/// Collects notifications in memory, for embedding hosts and tests.
#[derive(Debug, Default)]
pub struct RecordingSink {
    notifications: Mutex<Vec<Notification>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.notifications.lock().clone()
    }

    /// Drain everything recorded so far.
    pub fn take(&self) -> Vec<Notification> {
        std::mem::take(&mut *self.notifications.lock())
    }
}

impl NotificationSink for RecordingSink {
    fn show(&self, kind: NotificationKind, message: &str, details: Option<&str>, auto_dismiss: bool) {
        self.notifications.lock().push(Notification {
            kind,
            message: message.to_string(),
            details: details.map(str::to_string),
            auto_dismiss,
        });
    }
}
