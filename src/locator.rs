//! Locate the `batt` executable.
//!
//! Resolution order, first success wins:
//! 1. the custom path given by the user, if it exists,
//! 2. a lookup of `batt` in the [`SearchEnv`],
//! 3. the [`KNOWN_LOCATIONS`].
use crate::env::SearchEnv;
use crate::error::BattError;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Name of the external tool.
pub const TOOL_NAME: &str = "batt";

/// Conventional install locations, probed in order.
pub const KNOWN_LOCATIONS: [&str; 3] = [
    "/opt/homebrew/bin/batt",
    "/usr/local/bin/batt",
    "/usr/bin/batt",
];

/// Filesystem queries needed to locate the tool.
///
/// The use of a trait instead of calling directly [`Path::is_file`] and
/// [`which::which_in`] is needed in order to be able to check the lookup
/// order in tests.
#[cfg_attr(test, mockall::automock)]
pub trait PathProbe {
    /// Is there a file at `path` ?
    fn is_file(&self, path: &Path) -> bool;
    /// Look `name` up in the directories of `env`.
    fn lookup(&self, name: &str, env: &SearchEnv) -> Option<PathBuf>;
}

/// [`PathProbe`] backed by the real filesystem.
pub struct SystemPathProbe;

impl PathProbe for SystemPathProbe {
    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn lookup(&self, name: &str, env: &SearchEnv) -> Option<PathBuf> {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("/"));
        match which::which_in(name, Some(env.to_path_var()), cwd) {
            Ok(p) => Some(p),
            Err(e) => {
                debug!("`which {}` failed: {}", name, e);
                None
            }
        }
    }
}

/// Resolve the path of `batt`.
pub struct Locator {
    custom_path: Option<PathBuf>,
    probe: Box<dyn PathProbe>,
}

impl Locator {
    /// Create a locator. An empty or blank `custom_path` counts as unset.
    pub fn new(custom_path: Option<PathBuf>, probe: Box<dyn PathProbe>) -> Self {
        let custom_path = custom_path.and_then(|p| match p.to_str().map(str::trim) {
            Some("") => None,
            Some(trimmed) => Some(PathBuf::from(trimmed)),
            // not UTF-8: used as is
            None => Some(p),
        });
        Locator { custom_path, probe }
    }

    /// Probe used for filesystem queries.
    pub fn probe(&self) -> &dyn PathProbe {
        self.probe.as_ref()
    }

    /// Return the path of `batt` or [`BattError::NotFound`].
    ///
    /// Nothing is cached: each call probes the filesystem again.
    pub fn locate(&self, env: &SearchEnv) -> Result<PathBuf, BattError> {
        if let Some(custom) = &self.custom_path {
            if self.probe.is_file(custom) {
                debug!("Using custom batt path {:?}", custom);
                return Ok(custom.clone());
            }
            warn!("Custom batt path {:?} does not exist, ignoring it", custom);
        }

        if let Some(found) = self.probe.lookup(TOOL_NAME, env) {
            if self.probe.is_file(&found) {
                debug!("Found batt in search path at {:?}", found);
                return Ok(found);
            }
        }

        for location in KNOWN_LOCATIONS.iter().map(Path::new) {
            if self.probe.is_file(location) {
                debug!("Found batt at known location {:?}", location);
                return Ok(location.to_path_buf());
            }
        }
        Err(BattError::NotFound)
    }
}
