//! Run `batt` sub-commands and capture their output.
use crate::command::CommandRunner;
use crate::env::SearchEnv;
use crate::error::BattError;
use crate::locator::Locator;
use crate::notify::Notifier;
use std::path::Path;
use tracing::{debug, error, info};

/// Shell used when the direct invocation fails.
pub const SHELL: &str = "/bin/sh";

/// Scripting bridge used to get administrator privileges.
pub const OSASCRIPT: &str = "/usr/bin/osascript";

/// Privileges needed by a sub-command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Privilege {
    /// Run as the current user.
    User,
    /// Run behind the administrator password prompt.
    Administrator,
}

/// Runs `batt` once per call, resolving its path every time.
pub struct Executor {
    locator: Locator,
    runner: Box<dyn CommandRunner>,
    notifier: Box<dyn Notifier>,
}

impl Executor {
    /// Create an executor.
    pub fn new(
        locator: Locator,
        runner: Box<dyn CommandRunner>,
        notifier: Box<dyn Notifier>,
    ) -> Self {
        Executor {
            locator,
            runner,
            notifier,
        }
    }

    /// Locator used to resolve `batt`.
    pub fn locator(&self) -> &Locator {
        &self.locator
    }

    /// Runner used to spawn processes.
    pub fn runner(&self) -> &dyn CommandRunner {
        self.runner.as_ref()
    }

    /// Notification surface.
    pub fn notifier(&self) -> &dyn Notifier {
        self.notifier.as_ref()
    }

    /// Run `batt <subcommand>` and return its trimmed stdout.
    ///
    /// When `notify` is set, the outcome is also reported to the notifier.
    pub fn execute(
        &self,
        subcommand: &str,
        privilege: Privilege,
        notify: bool,
        env: &SearchEnv,
    ) -> Result<String, BattError> {
        let res = self.try_execute(subcommand, privilege, env);
        match &res {
            Ok(_) if notify => self
                .notifier
                .success(&format!("Command executed: {subcommand}")),
            Ok(_) => (),
            Err(e) => {
                error!("Error executing batt command: {}", e);
                if notify {
                    self.notifier.failure(&format!("Error: {e}"));
                }
            }
        }
        res
    }

    fn try_execute(
        &self,
        subcommand: &str,
        privilege: Privilege,
        env: &SearchEnv,
    ) -> Result<String, BattError> {
        let path = self.locator.locate(env)?;
        info!("Using batt command path: {:?}", path);
        let args = shell_words::split(subcommand)
            .map_err(|e| BattError::execution(subcommand, e))?;
        let full_command = command_line(&path, &args);

        let output = match privilege {
            Privilege::Administrator => {
                let script = elevation_script(&full_command);
                debug!("Executing with admin (osascript): {}", script);
                self.runner
                    .run(OSASCRIPT, vec!["-e".into(), script], env)
                    .map_err(|e| BattError::execution(&full_command, format!("{e:#}")))?
            }
            Privilege::User => self.run_unprivileged(&path, args, &full_command, env)?,
        };

        let output = output.trim();
        if output.is_empty() {
            return Err(BattError::EmptyOutput {
                command: full_command,
            });
        }
        debug!("Batt command output length: {}", output.len());
        debug!(
            "Batt command output (first 100 chars): {}",
            output.chars().take(100).collect::<String>()
        );
        Ok(output.to_owned())
    }

    /// Direct invocation, then once more through the shell which resolves
    /// aliases and relative names the way an interactive user would.
    fn run_unprivileged(
        &self,
        path: &Path,
        args: Vec<String>,
        full_command: &str,
        env: &SearchEnv,
    ) -> Result<String, BattError> {
        debug!("Executing direct command: {}", full_command);
        match self.runner.run(&path.to_string_lossy(), args, env) {
            Ok(out) => Ok(out),
            Err(direct) => {
                info!(
                    "Direct command failed, trying with shell: {:#}",
                    direct
                );
                self.runner
                    .run(SHELL, vec!["-c".into(), full_command.to_owned()], env)
                    .map_err(|e| BattError::execution(full_command, format!("{e:#}")))
            }
        }
    }
}

/// Shell-quoted command line for `path` followed by `args`.
pub fn command_line(path: &Path, args: &[String]) -> String {
    let program = path.to_string_lossy();
    shell_words::join(std::iter::once(&*program).chain(args.iter().map(String::as_str)))
}

/// AppleScript running `command` with administrator privileges.
pub fn elevation_script(command: &str) -> String {
    let escaped = command.replace('\\', "\\\\").replace('"', "\\\"");
    format!(
        "do shell script \"{escaped}\" with prompt \"Administrator Privileges Required\" with administrator privileges"
    )
}
