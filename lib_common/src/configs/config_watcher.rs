//! # Watcher Configuration
//!
//! Settings are layered, later sources overriding earlier ones:
//!
//! 1. built-in defaults,
//! 2. a JSON config file (`eddn_watcher.conf`, or `--config-path`),
//! 3. environment variables (`EDDN_*`),
//! 4. command-line arguments.
//!
//! clap resolves 3 and 4 together. The mode flags are mutually exclusive; passing
//! more than one is a usage error.

use clap::{ArgGroup, Parser};
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use crate::core::Mode;
use crate::ingestors::{RelayConfig, DEFAULT_RECV_TIMEOUT, DEFAULT_RELAY};

/// Looked up in the working directory when `--config-path` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "eddn_watcher.conf";

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Receive timeout must be at least one second")]
    ZeroTimeout,

    #[error("Invalid mode: {0}")]
    InvalidMode(String),

    #[error("Invalid log level '{0}' (expected off, error, warn, info, debug or trace)")]
    InvalidLogLevel(String),
}

#[derive(Parser, Deserialize, Serialize, Debug, Clone, Default)]
#[command(name = "eddn_watcher", about = "EDDN Watcher", version)]
#[command(group(
    ArgGroup::new("mode_flag")
        .args(["exploration", "new_systems", "docking"])
        .multiple(false)
))]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[arg(long, help = "If set, only exploration events are shown.")]
    #[serde(skip)]
    pub exploration: bool,

    #[arg(long, help = "If set, only newly discovered star systems are shown and recorded.")]
    #[serde(skip)]
    pub new_systems: bool,

    #[arg(long, help = "If set, only docking events are shown.")]
    #[serde(skip)]
    pub docking: bool,

    #[arg(long, env = "EDDN_MODE", help = "Mode when no mode flag is given (raw, exploration, new-systems, docking).")]
    pub mode: Option<String>,

    #[arg(long, env = "EDDN_CONFIG_PATH", help = "Path to the JSON configuration file.")]
    pub config_path: Option<PathBuf>,

    #[arg(long, env = "EDDN_RELAY", help = "ZeroMQ endpoint of the EDDN relay.")]
    pub endpoint: Option<String>,

    #[arg(long, env = "EDDN_RECV_TIMEOUT_SECS", help = "Seconds without a message before an idle notice is logged.")]
    pub recv_timeout_secs: Option<u64>,

    #[arg(long, env = "EDDN_DATA_DIR", help = "Directory holding discovered_systems.txt and discovered_systems.json.")]
    pub data_dir: Option<PathBuf>,

    #[arg(long, env = "EDDN_LOG_DIR", help = "Directory for log files.")]
    pub log_dir: Option<PathBuf>,

    #[arg(long, env = "EDDN_LOG_LEVEL", help = "Logging level (trace, debug, info, warn, error).")]
    pub log_level: Option<String>,
}

impl Config {
    fn defaults() -> Config {
        Config {
            endpoint: Some(DEFAULT_RELAY.to_string()),
            recv_timeout_secs: Some(DEFAULT_RECV_TIMEOUT.as_secs()),
            data_dir: Some(PathBuf::from(".")),
            log_dir: Some(PathBuf::from("./logs")),
            log_level: Some("info".to_string()),
            ..Default::default()
        }
    }

    // Merge two Config structs, where 'other' overrides 'self' for Some values
    fn merge(self, other: Config) -> Config {
        Config {
            exploration: other.exploration || self.exploration,
            new_systems: other.new_systems || self.new_systems,
            docking: other.docking || self.docking,
            mode: other.mode.or(self.mode),
            config_path: other.config_path.or(self.config_path),
            endpoint: other.endpoint.or(self.endpoint),
            recv_timeout_secs: other.recv_timeout_secs.or(self.recv_timeout_secs),
            data_dir: other.data_dir.or(self.data_dir),
            log_dir: other.log_dir.or(self.log_dir),
            log_level: other.log_level.or(self.log_level),
        }
    }

    /// Mode flags win over `mode`.
    fn selected_mode(&self) -> Result<Mode, ConfigError> {
        if self.exploration {
            Ok(Mode::Exploration)
        } else if self.new_systems {
            Ok(Mode::NewSystems)
        } else if self.docking {
            Ok(Mode::Docking)
        } else {
            match &self.mode {
                Some(mode) => Mode::from_str(mode).map_err(ConfigError::InvalidMode),
                None => Ok(Mode::Raw),
            }
        }
    }

    fn resolve(self) -> Result<WatcherSettings, ConfigError> {
        let mode = self.selected_mode()?;

        let recv_timeout = match self.recv_timeout_secs {
            Some(0) => return Err(ConfigError::ZeroTimeout),
            Some(secs) => Duration::from_secs(secs),
            None => DEFAULT_RECV_TIMEOUT,
        };

        let log_level = self.log_level.as_deref().unwrap_or("info");
        let log_level = LevelFilter::from_str(log_level)
            .map_err(|_| ConfigError::InvalidLogLevel(log_level.to_string()))?;

        Ok(WatcherSettings {
            mode,
            relay: RelayConfig {
                endpoint: self.endpoint.unwrap_or_else(|| DEFAULT_RELAY.to_string()),
                recv_timeout,
            },
            data_dir: self.data_dir.unwrap_or_else(|| PathBuf::from(".")),
            log_dir: self.log_dir.unwrap_or_else(|| PathBuf::from("./logs")),
            log_level,
        })
    }
}

/// Fully resolved settings for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct WatcherSettings {
    pub mode: Mode,
    pub relay: RelayConfig,
    pub data_dir: PathBuf,
    pub log_dir: PathBuf,
    pub log_level: LevelFilter,
}

/// Layers defaults, the config file and the already parsed CLI/env values.
///
/// Runs before logging is installed, so config file problems go to stderr.
pub fn load_config(cli: Config) -> Result<WatcherSettings, ConfigError> {
    let config_file_path = cli
        .config_path
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

    let mut current_config = Config::defaults();
    if let Some(file_config) = read_config_file(&config_file_path) {
        current_config = current_config.merge(file_config);
    }

    current_config.merge(cli).resolve()
}

fn read_config_file(path: &Path) -> Option<Config> {
    if !path.exists() {
        return None;
    }
    match fs::read_to_string(path) {
        Ok(config_str) => match serde_json::from_str::<Config>(&config_str) {
            Ok(file_config) => Some(file_config),
            Err(e) => {
                eprintln!(
                    "Failed to parse config file {}: {}. Falling back to other sources.",
                    path.display(),
                    e
                );
                None
            }
        },
        Err(e) => {
            eprintln!(
                "Failed to read config file {}: {}. Falling back to other sources.",
                path.display(),
                e
            );
            None
        }
    }
}
