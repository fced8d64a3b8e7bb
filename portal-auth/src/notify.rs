//! User-visible outcome notifications.

use log::*;

/// Receives the outcome of session actions (login, logout, forced logout) so the
/// front end can show them.
pub trait Notifier: Send + Sync {
    fn success(&self, message: &str);
    fn error(&self, message: &str);
}

/// Notifier that only writes to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn success(&self, message: &str) {
        info!("{}", message);
    }

    fn error(&self, message: &str) {
        error!("{}", message);
    }
}
