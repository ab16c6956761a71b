//! This module holds struct and helpers for parameters and configuration
use anyhow::{bail, Context, Result};
use directories_next::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use structopt::clap::AppSettings;
use tracing::debug;

use crate::battery::DEFAULT_LIMIT;
use crate::watch::REFRESH_INTERVAL;

/// Prefix of environment variables overriding config file values.
pub const ENV_PREFIX: &str = "BATTFRONT_";

/// `-v` / `-q` flags controlling the log level.
// Courtesy of structopt_flags crate
#[derive(structopt::StructOpt, Debug, Clone, Default, PartialEq)]
pub struct QuietVerbose {
    /// Increase the output's verbosity level
    ///
    /// Pass many times to increase verbosity level, up to 3.
    #[structopt(
        name = "quietverbose",
        long = "verbose",
        short = "v",
        parse(from_occurrences),
        conflicts_with = "quietquiet",
        global = true
    )]
    verbosity_level: u8,

    /// Decrease the output's verbosity level.
    ///
    /// Used once, it will set error log level.
    /// Used twice, will silent the log completely
    #[structopt(
        name = "quietquiet",
        long = "quiet",
        short = "q",
        parse(from_occurrences),
        conflicts_with = "quietverbose",
        global = true
    )]
    quiet_level: u8,
}

impl QuietVerbose {
    /// Log level filter, `Warn` when neither `-v` nor `-q` is given.
    pub fn get_level_filter(&self) -> &str {
        let quiet: i8 = self.quiet_level.min(2) as i8;
        let verbose: i8 = self.verbosity_level.min(3) as i8;
        match verbose - quiet {
            -2 => "Off",
            -1 => "Error",
            0 => "Warn",
            1 => "Info",
            2 => "Debug",
            _ => "Trace",
        }
    }
}

/// Sub-commands, one per battery operation.
#[derive(structopt::StructOpt, Debug, Clone, PartialEq)]
pub enum Command {
    /// Show battery charge limiting status
    Status {
        /// Keep refreshing the status
        #[structopt(short, long)]
        watch: bool,
        /// Seconds between two refreshes in watch mode (default 30)
        #[structopt(short, long)]
        interval: Option<u64>,
        /// Stop watching after this many refreshes
        #[structopt(short, long)]
        count: Option<u32>,
        /// Print the status as JSON
        #[structopt(long)]
        json: bool,
    },
    /// Set the upper battery charge limit (0-100), asking for administrator privileges
    Limit {
        /// Charge limit in percent (default 80, or `default_limit` from the config file)
        value: Option<String>,
    },
    /// Disable battery charge limiting, asking for administrator privileges
    Disable,
}

impl Default for Command {
    fn default() -> Self {
        Command::Status {
            watch: false,
            interval: None,
            count: None,
            json: false,
        }
    }
}

#[derive(structopt::StructOpt, Debug, Default)]
/// Control the batt battery charge limiter
///
/// Show the status, set the charge limit or disable charge limiting through
/// the `batt` command line tool.
#[structopt(global_settings(&[AppSettings::ColoredHelp, AppSettings::ColorAuto]))]
pub struct Args {
    /// path to the batt executable, overriding automatic discovery
    #[structopt(long, env = "BATT_PATH", parse(from_os_str))]
    pub batt_path: Option<PathBuf>,

    /// configuration file
    ///
    /// Will use `config.toml` in the user configuration directory if unset.
    #[structopt(long, parse(from_os_str))]
    pub config: Option<PathBuf>,

    /// do not print success/failure notifications
    #[structopt(long)]
    pub no_notify: bool,

    #[allow(missing_docs)]
    #[structopt(flatten)]
    pub verbose: QuietVerbose,

    /// operation to run
    #[structopt(subcommand)]
    pub command: Command,
}

/// Values that may come from the configuration file.
#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct FileConfig {
    /// custom path to the batt executable
    #[serde(alias = "customBattPath", skip_serializing_if = "Option::is_none")]
    pub custom_batt_path: Option<PathBuf>,
    /// seconds between two status refreshes
    pub refresh_interval: u64,
    /// show notifications
    pub notify: bool,
    /// default value of the `limit` sub-command
    pub default_limit: u8,
}

impl Default for FileConfig {
    fn default() -> Self {
        FileConfig {
            custom_batt_path: None,
            refresh_interval: REFRESH_INTERVAL.as_secs(),
            notify: true,
            default_limit: DEFAULT_LIMIT,
        }
    }
}

/// Command line values taking precedence over the file.
#[derive(Serialize, Debug, Default)]
struct Overrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    refresh_interval: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    notify: Option<bool>,
}

/// Validated configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// custom path to the batt executable
    pub custom_batt_path: Option<PathBuf>,
    /// delay between two status refreshes
    pub refresh_interval: Duration,
    /// show notifications
    pub notify: bool,
    /// default value of the `limit` sub-command
    pub default_limit: u8,
}

/// Default location of the configuration file.
pub fn default_config_file() -> Option<PathBuf> {
    ProjectDirs::from("net", "battfront", "battfront")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

impl Args {
    fn config_file(&self) -> Result<Option<PathBuf>> {
        match &self.config {
            Some(path) if !path.is_file() => bail!("Config file {:?} does not exist", path),
            Some(path) => Ok(Some(path.clone())),
            None => Ok(default_config_file().filter(|p| p.is_file())),
        }
    }

    fn overrides(&self) -> Overrides {
        let refresh_interval = match self.command {
            Command::Status { interval, .. } => interval,
            _ => None,
        };
        Overrides {
            refresh_interval,
            notify: if self.no_notify { Some(false) } else { None },
        }
    }

    /// Merge defaults → config file → `BATTFRONT_*` environment → command
    /// line, and check the result.
    pub fn validate(&self) -> Result<AppConfig> {
        let mut figment = Figment::from(Serialized::defaults(FileConfig::default()));
        if let Some(file) = self.config_file()? {
            debug!("Reading configuration from {:?}", file);
            figment = figment.merge(Toml::file(file));
        }
        let cfg: FileConfig = figment
            .merge(Env::prefixed(ENV_PREFIX))
            .merge(Serialized::defaults(self.overrides()))
            .extract()
            .context("Reading configuration")?;
        debug!("Merged configuration : {:#?}", cfg);

        if cfg.refresh_interval == 0 {
            bail!("Refresh interval must be greater than 0 seconds");
        }
        if let Command::Status { count: Some(0), .. } = self.command {
            bail!("Refresh count must be greater than 0");
        }
        if cfg.default_limit > 100 {
            bail!("default_limit must be between 0 and 100");
        }
        Ok(AppConfig {
            custom_batt_path: self.batt_path.clone().or(cfg.custom_batt_path),
            refresh_interval: Duration::from_secs(cfg.refresh_interval),
            notify: cfg.notify,
            default_limit: cfg.default_limit,
        })
    }
}
