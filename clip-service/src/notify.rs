//! Transient capture notifications

use tracing::info;

/// Shows a short, self-dismissing message to the user
pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str);
}

/// Notifier that writes to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, message: &str) {
        info!(target: "notification", "{}", message);
    }
}

/// Toast text for a saved item
pub fn saved_message(title: &str) -> String {
    format!("Saved to clipboard manager: {}", title)
}
