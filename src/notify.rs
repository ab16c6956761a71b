//! Transient notifications shown after a command ran.
use tracing::debug;

/// Surface for short success / failure messages.
#[cfg_attr(test, mockall::automock)]
pub trait Notifier {
    /// Report a success.
    fn success(&self, message: &str);
    /// Report a failure.
    fn failure(&self, message: &str);
}

/// Print notifications on stderr, keeping stdout for command output.
pub struct TerminalNotifier;

impl Notifier for TerminalNotifier {
    fn success(&self, message: &str) {
        eprintln!("✔ {message}");
    }
    fn failure(&self, message: &str) {
        eprintln!("✘ {message}");
    }
}

/// Drop every notification (`--no-notify`).
pub struct SilentNotifier;

impl Notifier for SilentNotifier {
    fn success(&self, message: &str) {
        debug!("Notification suppressed: {}", message);
    }
    fn failure(&self, message: &str) {
        debug!("Notification suppressed: {}", message);
    }
}
