//! The three operations offered to the user: status, limit and disable.
use crate::env::SearchEnv;
use crate::error::BattError;
use crate::executor::{Executor, Privilege};
use crate::format::StatusReport;
use crate::notify::Notifier;
use crate::status::fetch_status;
use std::ffi::OsString;
use std::fmt;
use std::str::FromStr;
use tracing::{error, info};

/// Default value offered for the charge limit.
pub const DEFAULT_LIMIT: u8 = 80;

/// Upper charge limit in percent, always within `0..=100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChargeLimit(u8);

impl ChargeLimit {
    /// Build a limit, rejecting values outside `0..=100`.
    pub fn new(value: i64) -> Result<Self, BattError> {
        if (0..=100).contains(&value) {
            Ok(ChargeLimit(value as u8))
        } else {
            Err(BattError::Validation(
                "Battery limit must be between 0 and 100".into(),
            ))
        }
    }

    /// Limit in percent.
    pub fn value(self) -> u8 {
        self.0
    }
}

/// Parse a limit typed by the user:
/// ```
/// use lib::battery::ChargeLimit;
/// let limit: ChargeLimit = " 75 ".parse().unwrap();
/// assert_eq!(limit.value(), 75);
/// assert!("101".parse::<ChargeLimit>().is_err());
/// assert!("eighty".parse::<ChargeLimit>().is_err());
/// ```
impl FromStr for ChargeLimit {
    type Err = BattError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: i64 = s.trim().parse().map_err(|_| {
            BattError::Validation("Limit must be a number between 0 and 100".into())
        })?;
        ChargeLimit::new(value)
    }
}

impl fmt::Display for ChargeLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Entry point for battery operations.
pub struct Battery {
    executor: Executor,
    /// `PATH` seen at startup, `None` when unset.
    path_var: Option<OsString>,
}

impl Battery {
    /// Create from an executor and the base `PATH` value.
    pub fn new(executor: Executor, path_var: Option<OsString>) -> Self {
        Battery { executor, path_var }
    }

    /// Notification surface of the underlying executor.
    pub fn notifier(&self) -> &dyn Notifier {
        self.executor.notifier()
    }

    /// Search environment for one operation.
    fn search_env(&self) -> SearchEnv {
        SearchEnv::from_path(self.path_var.as_deref())
    }

    /// Current battery status, with fallbacks.
    pub fn status(&self) -> Result<StatusReport, BattError> {
        let env = self.search_env();
        match fetch_status(&self.executor, &env) {
            Ok(raw) => Ok(StatusReport::new(&raw)),
            Err(e) => {
                error!("Failed to get battery status after all attempts: {}", e);
                Err(e)
            }
        }
    }

    /// Validate `input` and set it as the upper charge limit.
    ///
    /// Nothing is run when the input is invalid.
    pub fn set_limit(&self, input: &str) -> Result<ChargeLimit, BattError> {
        let limit = input.parse::<ChargeLimit>().inspect_err(|e| {
            error!("Rejecting battery limit {:?}: {}", input, e);
            self.executor.notifier().failure(&format!("Error: {e}"));
        })?;
        let env = self.search_env();
        self.executor
            .execute(
                &format!("limit {limit}"),
                Privilege::Administrator,
                true,
                &env,
            )
            .inspect_err(|e| error!("Failed to set battery limit to {}: {}", limit, e))?;
        info!("Battery charge limit set to {}%", limit);
        self.executor
            .notifier()
            .success(&format!("Battery charge limit set to {limit}%"));
        Ok(limit)
    }

    /// Disable charge limiting altogether.
    pub fn disable(&self) -> Result<String, BattError> {
        let env = self.search_env();
        self.executor
            .execute("disable", Privilege::Administrator, true, &env)
            .inspect_err(|e| error!("Failed to disable battery optimization: {}", e))
    }
}
