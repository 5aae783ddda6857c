//! # Configuration Module
//!
//! Loads the operator settings file and supplies defaults for everything it
//! leaves out.
//!
//! ## Overview
//!
//! Settings live in `config.toml` in the working directory. Keys may sit at
//! the top level or inside a single `[DEFAULT]` table; top-level keys win when
//! both are present. Unknown keys are ignored.
//!
//! Loading never aborts the run: a missing file silently yields defaults, and
//! a file that cannot be read, parsed or validated falls back entirely to
//! defaults with a warning the caller logs once logging is up.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::{AppConfig, CONFIG_FILE};
//!
//! let loaded = AppConfig::load_or_default(CONFIG_FILE);
//! if let Some(warning) = &loaded.warning {
//!     tracing::warn!("{}", warning);
//! }
//! let config = loaded.config;
//! ```
//!
//! Programmatic construction goes through the builder, which validates:
//!
//! ```
//! use core_runtime::config::AppConfig;
//!
//! let config = AppConfig::builder()
//!     .max_retry(3)
//!     .build()
//!     .expect("valid config");
//! assert_eq!(config.max_retry, 3);
//! ```

use crate::error::{Error, Result};
use crate::logging::LogLevel;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Settings file name, resolved against the working directory
pub const CONFIG_FILE: &str = "config.toml";

/// Section name accepted as a container for all keys
const DEFAULT_SECTION: &str = "DEFAULT";

const DEFAULT_TOKEN_FILE: &str = "token.json";
const DEFAULT_LOG_FILE: &str = "debug.log";
const DEFAULT_MAX_RETRY: u32 = 5;
const DEFAULT_RETRY_BASE_DELAY_MS: u64 = 1_000;
const DEFAULT_RETRY_MAX_DELAY_MS: u64 = 32_000;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;
const DEFAULT_DESTINATION_ATTEMPTS: u32 = 3;

/// How a downloaded file is checked against its remote record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerifyMode {
    /// SHA-256 digest plus size when the remote reports one
    #[default]
    Checksum,
    /// Byte length only
    Size,
}

impl VerifyMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerifyMode::Checksum => "checksum",
            VerifyMode::Size => "size",
        }
    }
}

impl std::fmt::Display for VerifyMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolved application settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Path to the stored OAuth credential file
    pub token_file: PathBuf,
    /// Append-only log file
    pub log_file: PathBuf,
    pub log_level: LogLevel,
    /// Total attempts for a rate-limited remote call
    pub max_retry: u32,
    /// First backoff delay; doubles on each retry
    pub retry_base_delay: Duration,
    pub retry_max_delay: Duration,
    /// Timeout applied to every remote request
    pub request_timeout: Duration,
    pub verify_mode: VerifyMode,
    /// Remove remote folders left empty by the run
    pub delete_empty_folders: bool,
    /// Destination prompts before giving up
    pub destination_attempts: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            token_file: PathBuf::from(DEFAULT_TOKEN_FILE),
            log_file: PathBuf::from(DEFAULT_LOG_FILE),
            log_level: LogLevel::Info,
            max_retry: DEFAULT_MAX_RETRY,
            retry_base_delay: Duration::from_millis(DEFAULT_RETRY_BASE_DELAY_MS),
            retry_max_delay: Duration::from_millis(DEFAULT_RETRY_MAX_DELAY_MS),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            verify_mode: VerifyMode::Checksum,
            delete_empty_folders: true,
            destination_attempts: DEFAULT_DESTINATION_ATTEMPTS,
        }
    }
}

/// Outcome of [`AppConfig::load_or_default`]
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: AppConfig,
    /// Set when the file existed but had to be ignored
    pub warning: Option<String>,
}

impl AppConfig {
    /// Creates a new builder seeded with the defaults.
    pub fn builder() -> AppConfigBuilder {
        AppConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - File paths are not empty
    /// - At least one attempt is allowed for remote calls and prompts
    /// - Backoff delays are positive and the cap is not below the base
    /// - Request timeout is positive
    pub fn validate(&self) -> Result<()> {
        if self.token_file.as_os_str().is_empty() {
            return Err(Error::Config("token_file cannot be empty".to_string()));
        }

        if self.log_file.as_os_str().is_empty() {
            return Err(Error::Config("log_file cannot be empty".to_string()));
        }

        if self.max_retry == 0 {
            return Err(Error::Config(
                "max_retry must be at least 1 (it counts the first attempt)".to_string(),
            ));
        }

        if self.retry_base_delay.is_zero() {
            return Err(Error::Config(
                "retry_base_delay_ms must be greater than 0".to_string(),
            ));
        }

        if self.retry_max_delay < self.retry_base_delay {
            return Err(Error::Config(
                "retry_max_delay_ms cannot be smaller than retry_base_delay_ms".to_string(),
            ));
        }

        if self.request_timeout.is_zero() {
            return Err(Error::Config(
                "request_timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.destination_attempts == 0 {
            return Err(Error::Config(
                "destination_attempts must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    /// Parse settings from TOML text.
    ///
    /// Absent keys take their defaults; the result is validated.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let mut table: toml::Table = toml::from_str(text)
            .map_err(|e: toml::de::Error| Error::Config(format!("invalid TOML: {}", e)))?;

        // Keys from the [DEFAULT] table fill whatever the top level leaves out.
        if let Some(section) = table.remove(DEFAULT_SECTION) {
            let toml::Value::Table(section) = section else {
                return Err(Error::Config(format!(
                    "[{}] must be a table",
                    DEFAULT_SECTION
                )));
            };
            for (key, value) in section {
                table.entry(key).or_insert(value);
            }
        }

        let raw: RawSettings = toml::Value::Table(table)
            .try_into()
            .map_err(|e: toml::de::Error| Error::Config(format!("invalid setting: {}", e)))?;

        raw.apply(AppConfig::builder()).build()
    }

    /// Load settings from `path`, never failing.
    pub fn load_or_default(path: impl AsRef<Path>) -> LoadedConfig {
        let path = path.as_ref();

        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return LoadedConfig {
                    config: AppConfig::default(),
                    warning: None,
                };
            }
            Err(e) => {
                return LoadedConfig {
                    config: AppConfig::default(),
                    warning: Some(format!(
                        "could not read {}: {}; using defaults",
                        path.display(),
                        e
                    )),
                };
            }
        };

        match Self::from_toml_str(&text) {
            Ok(config) => LoadedConfig {
                config,
                warning: None,
            },
            Err(e) => LoadedConfig {
                config: AppConfig::default(),
                warning: Some(format!("ignoring {}: {}; using defaults", path.display(), e)),
            },
        }
    }
}

/// On-disk shape of the settings file
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawSettings {
    token_file: Option<PathBuf>,
    log_file: Option<PathBuf>,
    log_level: Option<LogLevel>,
    max_retry: Option<u32>,
    retry_base_delay_ms: Option<u64>,
    retry_max_delay_ms: Option<u64>,
    request_timeout_secs: Option<u64>,
    verify_mode: Option<VerifyMode>,
    delete_empty_folders: Option<bool>,
    destination_attempts: Option<u32>,
}

impl RawSettings {
    fn apply(self, mut builder: AppConfigBuilder) -> AppConfigBuilder {
        if let Some(v) = self.token_file {
            builder = builder.token_file(v);
        }
        if let Some(v) = self.log_file {
            builder = builder.log_file(v);
        }
        if let Some(v) = self.log_level {
            builder = builder.log_level(v);
        }
        if let Some(v) = self.max_retry {
            builder = builder.max_retry(v);
        }
        if let Some(v) = self.retry_base_delay_ms {
            builder = builder.retry_base_delay(Duration::from_millis(v));
        }
        if let Some(v) = self.retry_max_delay_ms {
            builder = builder.retry_max_delay(Duration::from_millis(v));
        }
        if let Some(v) = self.request_timeout_secs {
            builder = builder.request_timeout(Duration::from_secs(v));
        }
        if let Some(v) = self.verify_mode {
            builder = builder.verify_mode(v);
        }
        if let Some(v) = self.delete_empty_folders {
            builder = builder.delete_empty_folders(v);
        }
        if let Some(v) = self.destination_attempts {
            builder = builder.destination_attempts(v);
        }
        builder
    }
}

/// Builder for constructing [`AppConfig`] instances.
///
/// Starts from the defaults; [`build()`](AppConfigBuilder::build) validates.
#[derive(Debug, Default)]
pub struct AppConfigBuilder {
    config: AppConfig,
}

impl AppConfigBuilder {
    pub fn token_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.config.token_file = path.into();
        self
    }

    pub fn log_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.config.log_file = path.into();
        self
    }

    pub fn log_level(mut self, level: LogLevel) -> Self {
        self.config.log_level = level;
        self
    }

    pub fn max_retry(mut self, attempts: u32) -> Self {
        self.config.max_retry = attempts;
        self
    }

    pub fn retry_base_delay(mut self, delay: Duration) -> Self {
        self.config.retry_base_delay = delay;
        self
    }

    pub fn retry_max_delay(mut self, delay: Duration) -> Self {
        self.config.retry_max_delay = delay;
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    pub fn verify_mode(mut self, mode: VerifyMode) -> Self {
        self.config.verify_mode = mode;
        self
    }

    pub fn delete_empty_folders(mut self, enabled: bool) -> Self {
        self.config.delete_empty_folders = enabled;
        self
    }

    pub fn destination_attempts(mut self, attempts: u32) -> Self {
        self.config.destination_attempts = attempts;
        self
    }

    pub fn build(self) -> Result<AppConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
