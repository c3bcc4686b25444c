//! Timer completion alerts

use crate::config_file::TimerConfig;
use crate::constants::NOTIFICATION_TIMEOUT_MS;
use crate::timers::{format_remaining, TimerCompletion};
use log::{info, warn};

/// Receives completions from the timer poll thread
pub trait CompletionNotifier: Send {
    fn notify(&self, completion: &TimerCompletion);
}

/// Only writes completions to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl CompletionNotifier for LogNotifier {
    fn notify(&self, completion: &TimerCompletion) {
        info!(
            "{} timer finished ({})",
            completion.kind.display_name(),
            format_remaining(completion.duration_secs)
        );
    }
}

/// Shows a desktop notification per completion when timer sounds are enabled
#[derive(Debug, Clone)]
pub struct DesktopNotifier {
    enabled: bool,
}

impl DesktopNotifier {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn from_config(timers: &TimerConfig) -> Self {
        Self::new(timers.sound_enabled)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

impl CompletionNotifier for DesktopNotifier {
    fn notify(&self, completion: &TimerCompletion) {
        LogNotifier.notify(completion);
        if !self.enabled {
            return;
        }

        let result = notify_rust::Notification::new()
            .summary(&format!("{} Timer", completion.kind.display_name()))
            .body(&format!(
                "{} elapsed",
                format_remaining(completion.duration_secs)
            ))
            .timeout(notify_rust::Timeout::Milliseconds(NOTIFICATION_TIMEOUT_MS))
            .show();

        if let Err(e) = result {
            warn!(
                "Failed to show notification for {}: {}",
                completion.kind, e
            );
        }
    }
}
