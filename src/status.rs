//! Battery status retrieval with fallbacks.
//!
//! The strategies of [`StatusStrategy::ALL`] are tried in order until one
//! returns a non empty output.
use crate::env::SearchEnv;
use crate::error::BattError;
use crate::executor::{Executor, Privilege, SHELL};
use crate::locator::{KNOWN_LOCATIONS, TOOL_NAME};
use std::fmt;
use std::path::Path;
use tracing::{debug, info, warn};

/// One way of getting `batt status` output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusStrategy {
    /// Regular [`Executor`] call.
    Executor,
    /// `batt status` through the shell with only the search path set.
    ShellSearchPath,
    /// Every existing known install location, run directly.
    KnownLocations,
}

impl StatusStrategy {
    /// Strategies in the order they are tried.
    pub const ALL: [StatusStrategy; 3] = [
        StatusStrategy::Executor,
        StatusStrategy::ShellSearchPath,
        StatusStrategy::KnownLocations,
    ];

    fn attempt(self, executor: &Executor, env: &SearchEnv) -> Result<String, BattError> {
        match self {
            StatusStrategy::Executor => executor.execute("status", Privilege::User, false, env),
            StatusStrategy::ShellSearchPath => {
                let path_var = env.to_path_var();
                let line = format!(
                    "PATH={} {} status",
                    shell_words::quote(&path_var.to_string_lossy()),
                    TOOL_NAME
                );
                debug!("Trying direct shell invocation: {}", line);
                let out = executor
                    .runner()
                    .run(SHELL, vec!["-c".into(), line.clone()], env)
                    .map_err(|e| BattError::execution(&line, format!("{e:#}")))?;
                non_empty(out, &line)
            }
            StatusStrategy::KnownLocations => {
                let probe = executor.locator().probe();
                let mut last = BattError::NotFound;
                for location in KNOWN_LOCATIONS.iter().map(Path::new) {
                    if !probe.is_file(location) {
                        continue;
                    }
                    debug!("Found batt at {:?}, trying to execute", location);
                    let program = location.to_string_lossy();
                    let line = format!("{program} status");
                    match executor
                        .runner()
                        .run(&program, vec!["status".into()], env)
                        .map_err(|e| BattError::execution(&line, format!("{e:#}")))
                        .and_then(|out| non_empty(out, &line))
                    {
                        Ok(out) => return Ok(out),
                        Err(e) => last = e,
                    }
                }
                Err(last)
            }
        }
    }
}

impl fmt::Display for StatusStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StatusStrategy::Executor => "batt status",
            StatusStrategy::ShellSearchPath => "shell with search path",
            StatusStrategy::KnownLocations => "known install locations",
        };
        f.write_str(name)
    }
}

fn non_empty(output: String, command: &str) -> Result<String, BattError> {
    let trimmed = output.trim();
    if trimmed.is_empty() {
        Err(BattError::EmptyOutput {
            command: command.to_owned(),
        })
    } else {
        Ok(trimmed.to_owned())
    }
}

/// Return `batt status` output, trying each of [`StatusStrategy::ALL`].
///
/// Failures of individual strategies are logged and collected in
/// [`BattError::StatusUnavailable`] when none succeeds.
pub fn fetch_status(executor: &Executor, env: &SearchEnv) -> Result<String, BattError> {
    let mut failures = Vec::new();
    for strategy in StatusStrategy::ALL {
        match strategy.attempt(executor, env) {
            Ok(out) => {
                if strategy != StatusStrategy::Executor {
                    info!("Got battery status via {}", strategy);
                }
                return Ok(out);
            }
            Err(e) => {
                warn!("Getting status via {} failed: {}", strategy, e);
                failures.push(format!("{strategy}: {e}"));
            }
        }
    }
    Err(BattError::StatusUnavailable(failures))
}
