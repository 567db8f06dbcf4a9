//! Desktop notifications via notify-rust.

use notify_rust::Notification;
use tracing::{debug, warn};

const TIMEOUT_MS: i32 = 5000;

pub struct Notifier {
    enabled: bool,
}

impl Notifier {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Shows a notification; returns whether one was actually shown.
    pub fn notify(&self, summary: &str, body: &str) -> bool {
        if !self.enabled {
            return false;
        }

        debug!(summary, "Notification");

        match Notification::new()
            .appname("parrot")
            .summary(summary)
            .body(body)
            .timeout(TIMEOUT_MS)
            .show()
        {
            Ok(_) => true,
            Err(e) => {
                warn!(error = %e, "Failed to show notification");
                false
            }
        }
    }
}
