//! Application configuration
//!
//! An optional TOML file in the platform config directory. Everything has a
//! built-in default, so a missing file is not an error; an unreadable or
//! unparseable one is, and surfaces at startup.

use std::error::Error as StdError;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::core::constants::AUTO_SAVE_INTERVAL;

#[derive(Debug, Serialize, Deserialize, Default, Clone)]
pub struct Config {
    /// Model selected when neither the CLI nor a restored session names one
    pub default_model: Option<String>,
    /// Override the completion API base URL
    pub base_url: Option<String>,
    /// Minutes between automatic session snapshots
    pub auto_save_minutes: Option<u64>,
}

/// Errors that can occur when loading configuration from disk.
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to parse the configuration file as valid TOML.
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Read { path, source } => {
                write!(f, "Failed to read config at {}: {}", path.display(), source)
            }
            ConfigError::Parse { path, source } => {
                write!(f, "Failed to parse config at {}: {}", path.display(), source)
            }
        }
    }
}

impl StdError for ConfigError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            ConfigError::Read { source, .. } => Some(source),
            ConfigError::Parse { source, .. } => Some(source),
        }
    }
}

impl Config {
    pub fn load() -> Result<Config, ConfigError> {
        Self::load_from_path(&Self::config_path())
    }

    pub fn load_from_path(config_path: &Path) -> Result<Config, ConfigError> {
        if !config_path.exists() {
            return Ok(Config::default());
        }
        let contents = fs::read_to_string(config_path).map_err(|source| ConfigError::Read {
            path: config_path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: config_path.to_path_buf(),
            source,
        })
    }

    fn config_path() -> PathBuf {
        let proj_dirs = ProjectDirs::from("org", "permacommons", "causerie")
            .expect("Failed to determine config directory");
        proj_dirs.config_dir().join("config.toml")
    }

    pub fn auto_save_interval(&self) -> Duration {
        self.auto_save_minutes
            .map(|minutes| Duration::from_secs(minutes * 60))
            .unwrap_or(AUTO_SAVE_INTERVAL)
    }
}
