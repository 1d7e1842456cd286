//! Notifiers
//!
//! The loader reports everything user-visible through a [`Notifier`]. The
//! default one writes to the log.

use tracing::{error, info};

use crate::module::traits::Notifier;

/// Routes notifications to `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, message: &str) {
        info!(target: "userscripts::notify", "{}", message);
    }

    fn notify_error(&self, title: &str, message: &str) {
        error!(target: "userscripts::notify", "{}: {}", title, message);
    }
}
