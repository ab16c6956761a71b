//! Abstraction over external command execution.
//!
//! [`CommandRunner`] allows swapping the real system command execution
//! ([`SystemCommandRunner`]) with a mock in tests, so that the `batt`,
//! `sh` and `osascript` invocations can be checked without the tools
//! being installed.

use crate::env::SearchEnv;
use anyhow::{bail, Context, Result};
use tracing::trace;

/// Trait for running external commands and capturing their stdout.
#[cfg_attr(test, mockall::automock)]
pub trait CommandRunner {
    /// Run `cmd` with the given `args`, `PATH` set to `env`, and return its
    /// stdout as a [`String`].
    ///
    /// A process exiting with a non zero status is an error.
    fn run(&self, cmd: &str, args: Vec<String>, env: &SearchEnv) -> Result<String>;
}

/// Default implementation that delegates to [`std::process::Command`].
pub struct SystemCommandRunner;

impl CommandRunner for SystemCommandRunner {
    fn run(&self, cmd: &str, args: Vec<String>, env: &SearchEnv) -> Result<String> {
        trace!("Spawning {} {:?}", cmd, args);
        let output = std::process::Command::new(cmd)
            .args(&args)
            .env("PATH", env.to_path_var())
            .output()
            .with_context(|| format!("Running {cmd}"))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("{} exited with {}: {}", cmd, output.status, stderr.trim());
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
