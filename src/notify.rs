//! User-facing feedback the manager asks the shell for

use tracing::{debug, warn};

pub trait Notifier {
    /// Ask the status area to redraw after the applet set changed
    fn redisplay_status(&mut self);

    /// Show a single notice to the user (a modal dialog in a real shell)
    fn notify_user(&mut self, message: &str);
}

/// Notifier that only reports through the log
#[derive(Debug, Default)]
pub struct LogNotifier {
    notices: Vec<String>,
    redisplays: usize,
}

impl LogNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Notices shown so far
    pub fn notices(&self) -> &[String] {
        &self.notices
    }

    /// Status redisplays requested so far
    pub fn redisplays(&self) -> usize {
        self.redisplays
    }
}

impl Notifier for LogNotifier {
    fn redisplay_status(&mut self) {
        self.redisplays += 1;
        debug!(count = self.redisplays, "Status area redisplay requested");
    }

    fn notify_user(&mut self, message: &str) {
        warn!(message = %message, "User notice");
        self.notices.push(message.to_string());
    }
}
