//! Configuration management for inquirydesk.
//!
//! Configuration is loaded with figment from TOML files, environment
//! variables, and built-in defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::controller::{SubmissionSettings, DEFAULT_NOTIFICATION_TTL, DEFAULT_SUBMIT_TIMEOUT};
use crate::error::{Error, Result};
use crate::store::DEFAULT_COLLECTION;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "inquirydesk";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "inquiries.db";

/// Upper bound for `timeout_secs` and `notification_secs`: one day.
pub const MAX_DURATION_SECS: u64 = 24 * 60 * 60;

/// Prefix for environment overrides.
const ENV_PREFIX: &str = "INQUIRYDESK_";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `INQUIRYDESK_`, sections
///    separated by `__`, e.g. `INQUIRYDESK_SUBMISSION__TIMEOUT_SECS=30`)
/// 2. TOML config file at `~/.config/inquirydesk/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Submission configuration.
    pub submission: SubmissionConfig,
}

/// Storage-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the database file.
    /// Defaults to `~/.local/share/inquirydesk/inquiries.db`
    pub database_path: Option<PathBuf>,
}

/// Submission-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubmissionConfig {
    /// Collection inquiries are appended to.
    pub collection: String,
    /// Seconds the record store gets before a submission times out.
    pub timeout_secs: u64,
    /// Seconds a notification stays visible.
    pub notification_secs: u64,
}

impl Default for SubmissionConfig {
    fn default() -> Self {
        Self {
            collection: DEFAULT_COLLECTION.to_string(),
            timeout_secs: DEFAULT_SUBMIT_TIMEOUT.as_secs(),
            notification_secs: DEFAULT_NOTIFICATION_TTL.as_secs(),
        }
    }
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
        let config: Config = Self::figment(config_file).extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file that must exist.
    ///
    /// Unlike [`load_from`](Self::load_from), a missing file is an error
    /// rather than a fallback to defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing, or if loading, parsing or
    /// validation fails.
    pub fn load_file(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::ConfigValidation {
                message: format!("configuration file not found: {}", path.display()),
            });
        }
        Self::load_from(Some(path.to_path_buf()))
    }

    fn figment(config_file: PathBuf) -> Figment {
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
        if self.submission.collection.trim().is_empty() {
            return Err(Error::ConfigValidation {
                message: "collection must not be empty".to_string(),
            });
        }

        check_duration_secs("timeout_secs", self.submission.timeout_secs)?;
        check_duration_secs("notification_secs", self.submission.notification_secs)
    }

    /// Get the database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }

    /// Get the submission timeout as a Duration.
    #[must_use]
    pub fn submit_timeout(&self) -> Duration {
        Duration::from_secs(self.submission.timeout_secs)
    }

    /// Get the notification lifetime as a Duration.
    #[must_use]
    pub fn notification_ttl(&self) -> Duration {
        Duration::from_secs(self.submission.notification_secs)
    }

    /// Controller settings derived from this configuration.
    #[must_use]
    pub fn submission_settings(&self) -> SubmissionSettings {
        SubmissionSettings {
            collection: self.submission.collection.clone(),
            timeout: self.submit_timeout(),
            notification_ttl: self.notification_ttl(),
        }
    }
}

fn check_duration_secs(name: &str, value: u64) -> Result<()> {
    if value == 0 {
        return Err(Error::ConfigValidation {
            message: format!("{name} must be greater than 0"),
        });
    }
    if value > MAX_DURATION_SECS {
        return Err(Error::ConfigValidation {
            message: format!(
                "{name} must be at most {MAX_DURATION_SECS} (one day), got {value}"
            ),
        });
    }
    Ok(())
}
