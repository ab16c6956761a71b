//! Periodic status refresh.
//!
//! [`ShutdownSignal`] lets another thread, or SIGINT / SIGTERM, stop the
//! refresh loop; the loop checks the flag while sleeping between two
//! refreshes.

use crate::battery::Battery;
use crate::error::BattError;
use crate::format::StatusReport;
use anyhow::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Default delay between two status refreshes.
pub const REFRESH_INTERVAL: Duration = Duration::from_secs(30);

/// Interval used by [`ShutdownSignal::sleep_or_stop`] to check the flag.
const SLEEP_CHUNK: Duration = Duration::from_millis(500);

/// Cooperative shutdown signal backed by an [`AtomicBool`].
///
/// Clones share the same flag.
#[derive(Clone, Debug, Default)]
pub struct ShutdownSignal {
    flag: Arc<AtomicBool>,
    /// Also stop once [`SIGNALLED`] is set.
    on_signals: bool,
}

/// Set from the SIGINT / SIGTERM handler.
static SIGNALLED: AtomicBool = AtomicBool::new(false);

#[cfg(unix)]
extern "C" fn handle_signal(_sig: i32) {
    // only async-signal-safe work here
    SIGNALLED.store(true, Ordering::SeqCst);
}

impl ShutdownSignal {
    /// Create a new signal with shutdown **not** requested.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a signal that is also requested by SIGINT or SIGTERM.
    ///
    /// Installs the process wide handlers for both signals.
    #[cfg(unix)]
    pub fn on_signals() -> Result<Self> {
        use nix::sys::signal::{sigaction, SaFlags, SigAction, SigHandler, SigSet, Signal};

        let action = SigAction::new(
            SigHandler::Handler(handle_signal),
            SaFlags::SA_RESTART,
            SigSet::empty(),
        );
        // The handler only stores into an atomic.
        unsafe {
            sigaction(Signal::SIGINT, &action)?;
            sigaction(Signal::SIGTERM, &action)?;
        }
        debug!("Installed SIGINT and SIGTERM handlers");
        Ok(ShutdownSignal {
            on_signals: true,
            ..Self::default()
        })
    }

    /// Without unix signals the default console handling stays in place.
    #[cfg(not(unix))]
    pub fn on_signals() -> Result<Self> {
        Ok(Self::default())
    }

    /// Request the loop to stop.
    pub fn request_shutdown(&self) {
        self.flag.store(true, Ordering::Release);
    }

    /// Returns `true` when shutdown has been requested.
    pub fn is_shutdown_requested(&self) -> bool {
        self.flag.load(Ordering::Acquire) || (self.on_signals && SIGNALLED.load(Ordering::SeqCst))
    }

    /// Sleep for `duration`, checking the shutdown flag every 500 ms.
    ///
    /// Returns `true` if shutdown was requested during the wait.
    pub fn sleep_or_stop(&self, duration: Duration) -> bool {
        let mut remaining = duration;
        while remaining > Duration::ZERO {
            if self.is_shutdown_requested() {
                return true;
            }
            let chunk = remaining.min(SLEEP_CHUNK);
            std::thread::sleep(chunk);
            remaining = remaining.saturating_sub(chunk);
        }
        self.is_shutdown_requested()
    }
}

/// Fetch the status every `interval` and hand each result to `show`.
///
/// Stops after `count` refreshes when given, or once `shutdown` is
/// requested. A result obtained after the shutdown request is dropped.
/// The first error returned by `show` ends the loop and is returned.
/// Otherwise returns the number of results shown.
pub fn watch_status<F, E>(
    battery: &Battery,
    interval: Duration,
    count: Option<u32>,
    shutdown: &ShutdownSignal,
    mut show: F,
) -> Result<u32, E>
where
    F: FnMut(Result<StatusReport, BattError>) -> Result<(), E>,
{
    let mut shown = 0;
    while count.map_or(true, |c| shown < c) {
        let res = battery.status();
        if shutdown.is_shutdown_requested() {
            debug!("Shutdown requested, discarding status");
            break;
        }
        show(res)?;
        shown += 1;
        if count.is_some_and(|c| shown >= c) {
            break;
        }
        if shutdown.sleep_or_stop(interval) {
            break;
        }
    }
    Ok(shown)
}

#[cfg(test)]
mod shutdown_should {
    use super::*;

    #[test]
    fn default_is_not_requested() {
        let sig = ShutdownSignal::new();
        assert!(!sig.is_shutdown_requested());
    }

    #[test]
    fn clone_shares_state() {
        let sig = ShutdownSignal::new();
        let sig2 = sig.clone();
        sig2.request_shutdown();
        assert!(sig.is_shutdown_requested());
    }

    #[test]
    fn sleep_or_stop_exits_early_on_shutdown() {
        let sig = ShutdownSignal::new();
        let sig2 = sig.clone();
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(100));
            sig2.request_shutdown();
        });
        let start = std::time::Instant::now();
        assert!(sig.sleep_or_stop(REFRESH_INTERVAL));
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn sleep_or_stop_completes_without_shutdown() {
        let sig = ShutdownSignal::new();
        assert!(!sig.sleep_or_stop(Duration::from_millis(50)));
    }

    #[cfg(unix)]
    #[test]
    fn be_requested_by_sigterm() -> anyhow::Result<()> {
        use nix::sys::signal::{raise, Signal};

        let sig = ShutdownSignal::on_signals()?;
        let plain = ShutdownSignal::new();
        raise(Signal::SIGTERM)?;
        assert!(sig.is_shutdown_requested());
        assert!(sig.clone().is_shutdown_requested());
        assert!(!plain.is_shutdown_requested());
        Ok(())
    }
}

#[cfg(test)]
mod watch_status_should {
    use super::*;
    use crate::command::MockCommandRunner;
    use crate::executor::Executor;
    use crate::locator::{Locator, MockPathProbe};
    use crate::notify::SilentNotifier;
    use std::path::{Path, PathBuf};
    use test_log::test;

    fn battery(runner: MockCommandRunner) -> Battery {
        let mut probe = MockPathProbe::new();
        probe
            .expect_lookup()
            .returning(|_, _| Some(PathBuf::from("/usr/bin/batt")));
        probe
            .expect_is_file()
            .returning(|p| p == Path::new("/usr/bin/batt"));
        Battery::new(
            Executor::new(
                Locator::new(None, Box::new(probe)),
                Box::new(runner),
                Box::new(SilentNotifier),
            ),
            None,
        )
    }

    #[test]
    fn refresh_count_times() -> anyhow::Result<()> {
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .times(3)
            .returning(|_, _, _| Ok("Limit: 80%".into()));
        let bat = battery(runner);
        let mut seen = Vec::new();
        let shown = watch_status(
            &bat,
            Duration::from_millis(10),
            Some(3),
            &ShutdownSignal::new(),
            |r| {
                seen.push(r.map(|s| s.raw));
                Ok::<_, anyhow::Error>(())
            },
        )?;
        assert_eq!(shown, 3);
        assert_eq!(seen, vec![Ok("Limit: 80%".to_string()); 3]);
        Ok(())
    }

    #[test]
    fn discard_result_after_shutdown() {
        let sig = ShutdownSignal::new();
        let sig2 = sig.clone();
        let mut runner = MockCommandRunner::new();
        runner.expect_run().times(1).returning(move |_, _, _| {
            sig2.request_shutdown();
            Ok("Limit: 80%".into())
        });
        let bat = battery(runner);
        let shown: Result<u32, String> = watch_status(&bat, REFRESH_INTERVAL, None, &sig, |_| {
            panic!("nothing should be shown")
        });
        assert_eq!(shown, Ok(0));
    }

    #[test]
    fn not_refresh_when_count_is_zero() {
        let mut runner = MockCommandRunner::new();
        runner.expect_run().times(0);
        let bat = battery(runner);
        let shown: Result<u32, String> = watch_status(
            &bat,
            Duration::from_millis(10),
            Some(0),
            &ShutdownSignal::new(),
            |_| panic!("nothing should be shown"),
        );
        assert_eq!(shown, Ok(0));
    }

    #[test]
    fn stop_at_first_failure_to_show() {
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .times(1)
            .returning(|_, _, _| Ok("Limit: 80%".into()));
        let bat = battery(runner);
        let res = watch_status(
            &bat,
            Duration::from_millis(10),
            Some(5),
            &ShutdownSignal::new(),
            |_| Err("output closed".to_string()),
        );
        assert_eq!(res, Err("output closed".to_string()));
    }
}
