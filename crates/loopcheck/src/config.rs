//! Configuration management for loopcheck.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::activity::{DEFAULT_FEED_CAPACITY, MAX_FEED_CAPACITY};
use crate::error::{Error, Result};
use crate::session::ControllerOptions;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "loopcheck";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "loopcheck.db";

/// Environment variable prefix; nested keys are separated by `__`.
const ENV_PREFIX: &str = "LOOPCHECK_";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (`LOOPCHECK_CAPTURE__TIMEOUT_SECS=60`)
/// 2. TOML config file at `~/.config/loopcheck/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Session event configuration.
    pub session: SessionConfig,
    /// Activity feed configuration.
    pub activity: ActivityConfig,
    /// Photo capture configuration.
    pub capture: CaptureConfig,
}

/// Storage-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the database file.
    /// Defaults to `~/.local/share/loopcheck/loopcheck.db`
    pub database_path: Option<PathBuf>,
}

/// Session event configuration.
///
/// The clock always ticks once per second; there is no setting for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Capacity of the session event channel.
    pub event_buffer: usize,
}

/// Activity feed configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActivityConfig {
    /// Entries kept in the recent activity feed, at most 5.
    pub feed_capacity: usize,
}

/// Photo capture configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Seconds before a capture is abandoned.
    pub timeout_secs: u64,
    /// Largest accepted image file, in bytes.
    pub max_photo_bytes: u64,
    /// Accepted image media types.
    pub accepted_types: Vec<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { event_buffer: 64 }
    }
}

impl Default for ActivityConfig {
    fn default() -> Self {
        Self {
            feed_capacity: DEFAULT_FEED_CAPACITY,
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            max_photo_bytes: 10 * 1024 * 1024,
            accepted_types: default_accepted_types(),
        }
    }
}

/// Image types the file picker accepts by default.
fn default_accepted_types() -> Vec<String> {
    vec![
        "image/jpeg".to_string(),
        "image/png".to_string(),
        "image/webp".to_string(),
    ]
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading, parsing or validation fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);
        let config = Self::figment(&config_file).extract::<Self>()?;
        config.validate()?;
        Ok(config)
    }

    fn figment(config_file: &Path) -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(config_file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("session.event_buffer", self.session.event_buffer as u64),
            ("activity.feed_capacity", self.activity.feed_capacity as u64),
            ("capture.timeout_secs", self.capture.timeout_secs),
            ("capture.max_photo_bytes", self.capture.max_photo_bytes),
        ];
        if let Some((name, _)) = positive.iter().find(|(_, value)| *value == 0) {
            return Err(Error::ConfigValidation {
                message: format!("{name} must be greater than 0"),
            });
        }

        if self.activity.feed_capacity > MAX_FEED_CAPACITY {
            return Err(Error::ConfigValidation {
                message: format!("activity.feed_capacity must be at most {MAX_FEED_CAPACITY}"),
            });
        }

        if self.capture.accepted_types.is_empty() {
            return Err(Error::ConfigValidation {
                message: "capture.accepted_types must not be empty".to_string(),
            });
        }
        if let Some(bad) = self
            .capture
            .accepted_types
            .iter()
            .find(|t| !t.starts_with("image/"))
        {
            return Err(Error::ConfigValidation {
                message: format!("capture.accepted_types entry '{bad}' is not an image type"),
            });
        }

        Ok(())
    }

    /// Get the database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }

    /// Get the capture timeout as a Duration.
    #[must_use]
    pub fn capture_timeout(&self) -> Duration {
        Duration::from_secs(self.capture.timeout_secs)
    }

    /// Options for a [`crate::session::SessionController`].
    #[must_use]
    pub fn controller_options(&self) -> ControllerOptions {
        ControllerOptions {
            event_buffer: self.session.event_buffer,
            feed_capacity: self.activity.feed_capacity,
            capture_timeout: self.capture_timeout(),
            ..ControllerOptions::default()
        }
    }
}
