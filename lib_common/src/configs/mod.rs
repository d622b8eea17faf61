//! # Configuration Modules
//!
//! Layered configuration for the watcher binary: defaults, a JSON file,
//! environment variables and command-line flags.

/// CLI/env/file configuration of the EDDN watcher.
pub mod config_watcher;

pub use config_watcher::{load_config, Config, ConfigError, WatcherSettings, DEFAULT_CONFIG_FILE};
