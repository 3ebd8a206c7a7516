//! Notification side channel for user-facing success/failure messages

use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Success,
    Error,
}

/// Receives toast-style notifications. Owned by the caller, injected into
/// executors.
pub trait Notifier: Send + Sync {
    fn notify(&self, title: &str, message: &str, kind: NotificationKind);
}

/// Discards every notification
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn notify(&self, _title: &str, _message: &str, _kind: NotificationKind) {}
}

/// Emits notifications as tracing events
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, title: &str, message: &str, kind: NotificationKind) {
        match kind {
            NotificationKind::Success => tracing::info!(title, message, "notification"),
            NotificationKind::Error => tracing::warn!(title, message, "notification"),
        }
    }
}

/// A notification captured by [`RecordingNotifier`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub message: String,
    pub kind: NotificationKind,
}

/// Keeps every notification in memory. Useful in tests and for callers that
/// render notifications themselves.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    entries: Arc<Mutex<Vec<Notification>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<Notification> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, title: &str, message: &str, kind: NotificationKind) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(Notification {
                title: title.to_string(),
                message: message.to_string(),
                kind,
            });
        }
    }
}
