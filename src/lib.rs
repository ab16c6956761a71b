#![warn(missing_docs)]
//! Battfront main components and helper functions used by `main`
use anyhow::{Context, Result};
use chrono::Local;
use std::io::Write;
use tracing::{debug, info};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter};

pub mod battery;
pub mod command;
pub mod config;
pub mod env;
pub mod error;
pub mod executor;
pub mod format;
pub mod locator;
pub mod notify;
pub mod status;
pub mod watch;
pub use battery::{Battery, ChargeLimit};
pub use config::{AppConfig, Args, Command};
pub use error::BattError;
pub use format::StatusReport;
pub use watch::ShutdownSignal;

use command::SystemCommandRunner;
use executor::Executor;
use locator::{Locator, SystemPathProbe};
use notify::{Notifier, SilentNotifier, TerminalNotifier};

/// Setup logging to stderr, stdout being kept for command output.
/// (Tracing is a bit more involving to set up but will provide much more feature if needed)
pub fn setup_tracing(args: &Args) -> Result<()> {
    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);
    let filter_layer =
        EnvFilter::try_new(args.verbose.get_level_filter()).context("Initializing log filter")?;

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();
    Ok(())
}

/// Create the [`Battery`] talking to the real system.
pub fn build_battery(config: &AppConfig) -> Battery {
    let notifier: Box<dyn Notifier> = if config.notify {
        Box::new(TerminalNotifier)
    } else {
        Box::new(SilentNotifier)
    };
    let executor = Executor::new(
        Locator::new(config.custom_batt_path.clone(), Box::new(SystemPathProbe)),
        Box::new(SystemCommandRunner),
        notifier,
    );
    Battery::new(executor, std::env::var_os("PATH"))
}

/// Write `error` on `out`, as a JSON object or as an error panel.
fn write_error<W: Write>(out: &mut W, error: &BattError, json: bool) -> Result<()> {
    if json {
        let value = serde_json::json!({
            "error": error.to_string(),
            "remediation": error.remediation(),
        });
        writeln!(out, "{}", serde_json::to_string_pretty(&value)?)?;
    } else {
        writeln!(out, "{}", format::render_error(error))?;
    }
    Ok(())
}

/// Show `error` on `out` and turn it into an [`anyhow::Error`].
fn report_error<W: Write>(out: &mut W, error: BattError, json: bool) -> anyhow::Error {
    if let Err(e) = write_error(out, &error, json) {
        debug!("Unable to write error: {:#}", e);
    }
    error.into()
}

fn write_status<W: Write>(out: &mut W, report: &StatusReport, json: bool) -> Result<()> {
    if json {
        writeln!(out, "{}", serde_json::to_string_pretty(report)?)?;
    } else {
        writeln!(out, "{}", format::render_status(report, Local::now()))?;
    }
    Ok(())
}

fn notify_status_failure(battery: &Battery) {
    battery
        .notifier()
        .failure("Could not get battery status. Make sure 'batt' CLI is installed.");
}

/// Run the operation selected by `command`, writing its output to `out`.
///
/// Errors have already been shown to the user (notification and error
/// panel) when this returns `Err`. In watch mode, a failure to write on
/// `out` stops the loop, and a refresh that failed makes the whole run fail.
pub fn run_command<W: Write>(
    command: &Command,
    config: &AppConfig,
    battery: &Battery,
    shutdown: &ShutdownSignal,
    out: &mut W,
) -> Result<()> {
    match command {
        Command::Status {
            watch: false,
            json,
            ..
        } => match battery.status() {
            Ok(report) => write_status(out, &report, *json),
            Err(e) => {
                notify_status_failure(battery);
                Err(report_error(out, e, *json))
            }
        },
        Command::Status { json, count, .. } => {
            info!(
                "Refreshing battery status every {}s",
                config.refresh_interval.as_secs()
            );
            let mut failed = None;
            let shown = watch::watch_status(
                battery,
                config.refresh_interval,
                *count,
                shutdown,
                |res| -> Result<()> {
                    match res {
                        Ok(report) => write_status(&mut *out, &report, *json)?,
                        Err(e) => {
                            notify_status_failure(battery);
                            write_error(&mut *out, &e, *json)?;
                            failed.get_or_insert(e);
                        }
                    }
                    if !*json {
                        // keep successive refreshes apart
                        writeln!(&mut *out)?;
                    }
                    Ok(())
                },
            )?;
            debug!("Shown {} status refreshes", shown);
            match failed {
                Some(e) => Err(e.into()),
                None => Ok(()),
            }
        }
        Command::Limit { value } => {
            let value = value
                .clone()
                .unwrap_or_else(|| config.default_limit.to_string());
            match battery.set_limit(&value) {
                Ok(limit) => {
                    debug!("Limit {}% applied", limit);
                    Ok(())
                }
                Err(e) => Err(report_error(out, e, false)),
            }
        }
        Command::Disable => match battery.disable() {
            Ok(output) => {
                writeln!(out, "{output}")?;
                Ok(())
            }
            Err(e) => Err(report_error(out, e, false)),
        },
    }
}


#[cfg(test)]
mod run_command_should {
    use super::*;
    use crate::command::MockCommandRunner;
    use crate::executor::tests::probe_finding;
    use crate::locator::MockPathProbe;
    use crate::notify::MockNotifier;
    use anyhow::anyhow;
    use std::path::Path;
    use std::time::Duration;
    use test_log::test;

    fn config() -> AppConfig {
        AppConfig {
            custom_batt_path: None,
            refresh_interval: Duration::from_millis(10),
            notify: true,
            default_limit: 80,
        }
    }

    fn battery(probe: MockPathProbe, runner: MockCommandRunner, notifier: MockNotifier) -> Battery {
        Battery::new(
            Executor::new(
                Locator::new(None, Box::new(probe)),
                Box::new(runner),
                Box::new(notifier),
            ),
            Some("/usr/bin:/bin".into()),
        )
    }

    #[test]
    fn render_status_without_fallback() -> Result<()> {
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .withf(|cmd, args, _| cmd == "/opt/homebrew/bin/batt" && args == &["status"])
            .times(1)
            .returning(|_, _, _| Ok("Limit: 80%\nEnabled: yes".into()));
        let mut notifier = MockNotifier::new();
        notifier.expect_failure().times(0);
        let bat = battery(probe_finding("/opt/homebrew/bin/batt"), runner, notifier);

        let mut out = Vec::new();
        run_command(
            &Command::default(),
            &config(),
            &bat,
            &ShutdownSignal::new(),
            &mut out,
        )?;
        let out = String::from_utf8(out)?;
        assert!(out.starts_with("# Battery Status\n\n**Limit**: 80%\n**Enabled**: yes\n"));
        Ok(())
    }

    #[test]
    fn print_status_as_json() -> Result<()> {
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .returning(|_, _, _| Ok("Limit: 80%".into()));
        let bat = battery(probe_finding("/usr/bin/batt"), runner, MockNotifier::new());

        let mut out = Vec::new();
        let cmd = Command::Status {
            watch: false,
            interval: None,
            count: None,
            json: true,
        };
        run_command(&cmd, &config(), &bat, &ShutdownSignal::new(), &mut out)?;
        let value: serde_json::Value = serde_json::from_slice(&out)?;
        assert_eq!(value["raw"], "Limit: 80%");
        assert_eq!(value["entries"][0]["key"], "Limit");
        assert_eq!(value["entries"][0]["value"], "80%");
        Ok(())
    }

    #[test]
    fn refresh_status_in_watch_mode() -> Result<()> {
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .times(2)
            .returning(|_, _, _| Ok("Limit: 80%".into()));
        let bat = battery(probe_finding("/usr/bin/batt"), runner, MockNotifier::new());

        let mut out = Vec::new();
        let cmd = Command::Status {
            watch: true,
            interval: None,
            count: Some(2),
            json: false,
        };
        run_command(&cmd, &config(), &bat, &ShutdownSignal::new(), &mut out)?;
        let out = String::from_utf8(out)?;
        assert_eq!(out.matches("# Battery Status").count(), 2);
        Ok(())
    }

    #[test]
    fn reject_out_of_range_limit_without_process() {
        let mut probe = MockPathProbe::new();
        probe.expect_lookup().times(0);
        probe.expect_is_file().times(0);
        let mut runner = MockCommandRunner::new();
        runner.expect_run().times(0);
        let mut notifier = MockNotifier::new();
        notifier
            .expect_failure()
            .withf(|m| m.contains("between 0 and 100"))
            .times(1)
            .return_const(());
        let bat = battery(probe, runner, notifier);

        let mut out = Vec::new();
        let cmd = Command::Limit {
            value: Some("150".into()),
        };
        assert!(run_command(&cmd, &config(), &bat, &ShutdownSignal::new(), &mut out).is_err());
        let out = String::from_utf8_lossy(&out);
        assert!(out.contains("# Error"));
        assert!(out.contains("Enter a whole number between 0 and 100"));
    }

    #[test]
    fn use_default_limit_when_none_given() -> Result<()> {
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .withf(|_, args, _| args[1].contains("batt limit 80\""))
            .times(1)
            .returning(|_, _, _| Ok("ok".into()));
        let mut notifier = MockNotifier::new();
        notifier.expect_success().times(2).return_const(());
        let bat = battery(probe_finding("/usr/bin/batt"), runner, notifier);

        let mut out = Vec::new();
        run_command(
            &Command::Limit { value: None },
            &config(),
            &bat,
            &ShutdownSignal::new(),
            &mut out,
        )?;
        Ok(())
    }

    #[test]
    fn show_error_panel_when_status_is_unavailable() {
        let mut probe = MockPathProbe::new();
        probe.expect_lookup().returning(|_, _| None);
        probe
            .expect_is_file()
            .returning(|p| p == Path::new("/nonexistent"));
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .returning(|_, _, _| Err(anyhow!("sh: batt: command not found")));
        let mut notifier = MockNotifier::new();
        notifier.expect_failure().times(1).return_const(());
        let bat = battery(probe, runner, notifier);

        let mut out = Vec::new();
        let res = run_command(
            &Command::default(),
            &config(),
            &bat,
            &ShutdownSignal::new(),
            &mut out,
        );
        assert!(res.is_err());
        let out = String::from_utf8_lossy(&out);
        assert!(out.contains("All attempts to get battery status failed"));
        assert!(out.contains("Run `batt status` in a terminal"));
    }

    #[test]
    fn print_disable_output() -> Result<()> {
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .times(1)
            .returning(|_, _, _| Ok("Disabled charge limit\n".into()));
        let mut notifier = MockNotifier::new();
        notifier.expect_success().times(1).return_const(());
        let bat = battery(probe_finding("/usr/bin/batt"), runner, notifier);

        let mut out = Vec::new();
        run_command(&Command::Disable, &config(), &bat, &ShutdownSignal::new(), &mut out)?;
        assert_eq!(String::from_utf8(out)?, "Disabled charge limit\n");
        Ok(())
    }

    /// Writer whose reader went away.
    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::ErrorKind::BrokenPipe.into())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn stop_watching_when_output_is_closed() {
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .times(1)
            .returning(|_, _, _| Ok("Limit: 80%".into()));
        let bat = battery(probe_finding("/usr/bin/batt"), runner, MockNotifier::new());

        let cmd = Command::Status {
            watch: true,
            interval: None,
            count: Some(5),
            json: false,
        };
        let err = run_command(&cmd, &config(), &bat, &ShutdownSignal::new(), &mut ClosedPipe)
            .unwrap_err();
        let io = err
            .downcast_ref::<std::io::Error>()
            .expect("an I/O error");
        assert_eq!(io.kind(), std::io::ErrorKind::BrokenPipe);
    }

    #[test]
    fn print_json_error_when_status_is_unavailable() -> Result<()> {
        let mut probe = MockPathProbe::new();
        probe.expect_lookup().returning(|_, _| None);
        probe.expect_is_file().return_const(false);
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .returning(|_, _, _| Err(anyhow!("sh: batt: command not found")));
        let mut notifier = MockNotifier::new();
        notifier.expect_failure().times(1).return_const(());
        let bat = battery(probe, runner, notifier);

        let mut out = Vec::new();
        let cmd = Command::Status {
            watch: false,
            interval: None,
            count: None,
            json: true,
        };
        assert!(run_command(&cmd, &config(), &bat, &ShutdownSignal::new(), &mut out).is_err());
        let value: serde_json::Value = serde_json::from_slice(&out)?;
        assert!(value["error"]
            .as_str()
            .is_some_and(|e| e.contains("All attempts to get battery status failed")));
        assert!(value["remediation"]
            .as_array()
            .is_some_and(|steps| !steps.is_empty()));
        Ok(())
    }
}
