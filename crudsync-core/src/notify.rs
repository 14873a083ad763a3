//! User-facing success/failure reporting.

use std::sync::Mutex;

/// Receives one message per finished operation. Fire-and-forget: a
/// notifier can't fail and nothing it does feeds back into engine state.
pub trait Notifier: Send + Sync {
    fn success(&self, message: &str);

    fn error(&self, message: &str);
}

/// Routes notifications to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn success(&self, message: &str) {
        tracing::info!("{}", message);
    }

    fn error(&self, message: &str) {
        tracing::error!("{}", message);
    }
}

/// A recorded notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Success(String),
    Error(String),
}

/// Keeps every notification in memory, in order.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.notices
            .lock()
            .map(|n| n.clone())
            .unwrap_or_default()
    }

    fn push(&self, notice: Notice) {
        if let Ok(mut notices) = self.notices.lock() {
            notices.push(notice);
        }
    }
}

impl Notifier for RecordingNotifier {
    fn success(&self, message: &str) {
        self.push(Notice::Success(message.to_string()));
    }

    fn error(&self, message: &str) {
        self.push(Notice::Error(message.to_string()));
    }
}

/// Capitalizes the first letter of an item noun for sentence-initial use.
pub(crate) fn capitalize(noun: &str) -> String {
    let mut chars = noun.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
