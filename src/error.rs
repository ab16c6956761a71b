//! Errors surfaced by the battery operations.
use thiserror::Error;

/// Error specific to locating and running `batt`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BattError {
    /// `batt` is neither at the custom path, in the search path nor in a known location.
    #[error("Batt CLI not found. Please install it or specify a custom path in preferences.")]
    NotFound,
    /// The process could not be run, failed, or the elevation prompt was declined.
    #[error("Failed to execute batt command `{command}`: {reason}")]
    Execution {
        #[allow(missing_docs)]
        command: String,
        #[allow(missing_docs)]
        reason: String,
    },
    /// The process succeeded but printed nothing usable.
    #[error("batt command `{command}` returned no output")]
    EmptyOutput {
        #[allow(missing_docs)]
        command: String,
    },
    /// Invalid user input, rejected before anything is run.
    #[error("{0}")]
    Validation(String),
    /// Every status strategy failed.
    #[error("All attempts to get battery status failed ({})", .0.join("; "))]
    StatusUnavailable(Vec<String>),
}

impl BattError {
    pub(crate) fn execution(command: &str, reason: impl ToString) -> Self {
        BattError::Execution {
            command: command.to_owned(),
            reason: reason.to_string(),
        }
    }

    /// Whether the failure comes from the user dismissing the elevation prompt.
    pub fn is_cancellation(&self) -> bool {
        match self {
            BattError::Execution { reason, .. } => {
                reason.contains("User canceled") || reason.contains("(-128)")
            }
            _ => false,
        }
    }

    /// Steps offered to the user alongside the error.
    pub fn remediation(&self) -> Vec<&'static str> {
        match self {
            BattError::Validation(_) => vec!["Enter a whole number between 0 and 100"],
            _ if self.is_cancellation() => {
                vec!["Approve the administrator prompt to apply the change"]
            }
            _ => vec![
                "Verify that batt is installed (`brew install batt`)",
                "Run `batt status` in a terminal to check it works",
                "Set a custom path with `--batt-path` or `custom_batt_path` in the config file",
            ],
        }
    }
}
