//! Executable search path used for every lookup and child process of an operation.
//!
//! [`SearchEnv`] is built once from the process `PATH` and the usual install
//! directories of `batt`. It is never written back to the process
//! environment: each child process receives it explicitly as its `PATH`.
use std::ffi::{OsStr, OsString};
use std::path::PathBuf;
use tracing::warn;

/// Search path used when `PATH` is not set at all.
pub const DEFAULT_PATH: &str = "/opt/homebrew/bin:/usr/local/bin:/usr/bin:/bin";

/// Directories prepended to the search path (Homebrew on Apple silicon and Intel).
pub const EXTRA_DIRS: [&str; 2] = ["/opt/homebrew/bin", "/usr/local/bin"];

/// Immutable augmented search path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchEnv {
    dirs: Vec<PathBuf>,
}

impl SearchEnv {
    /// Build from the current process `PATH`.
    pub fn from_process() -> Self {
        Self::from_path(std::env::var_os("PATH").as_deref())
    }

    /// Build from an explicit `PATH` value, `None` meaning unset.
    pub fn from_path(path: Option<&OsStr>) -> Self {
        let base = path.unwrap_or_else(|| OsStr::new(DEFAULT_PATH));
        let mut dirs: Vec<PathBuf> = EXTRA_DIRS.iter().map(PathBuf::from).collect();
        for dir in std::env::split_paths(base) {
            if !dir.as_os_str().is_empty() && !dirs.contains(&dir) {
                dirs.push(dir);
            }
        }
        SearchEnv { dirs }
    }

    /// Directories in lookup order.
    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }

    /// Value suitable for a `PATH` environment variable.
    pub fn to_path_var(&self) -> OsString {
        match std::env::join_paths(&self.dirs) {
            Ok(p) => p,
            Err(e) => {
                warn!("Unable to join search path {:?}: {}", self.dirs, e);
                OsString::from(DEFAULT_PATH)
            }
        }
    }
}
