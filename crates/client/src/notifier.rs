//! User-facing alerts.

use std::sync::Mutex;

use tracing::info;

pub const ANALYSIS_STARTED: &str =
    "Your citation analysis has been started. Results will be available soon.";
pub const ANALYSIS_FAILED: &str = "Failed to start citation analysis. Please try again later.";

/// Shows a blocking message to the user.
pub trait Notifier: Send + Sync {
    fn alert(&self, message: &str);
}

/// Alerts written to the log, for headless use.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn alert(&self, message: &str) {
        info!(alert = message, "user alert");
    }
}

/// Keeps every alert in memory.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl Notifier for RecordingNotifier {
    fn alert(&self, message: &str) {
        self.messages
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(message.to_string());
    }
}
