//! # Logging & Tracing Infrastructure
//!
//! Provides structured logging with the `tracing` crate, supporting:
//! - Pretty, compact and JSON terminal output (stderr)
//! - An append-only plain-text log file written off the hot path
//! - Module-level filtering
//! - Redaction helpers for tokens, emails and paths
//!
//! ## Overview
//!
//! [`init_logging`] installs one subscriber with two layers. The terminal
//! layer writes to stderr so that interactive prompts on stdout stay readable.
//! The file layer appends one line per event (timestamp, level, target,
//! message and fields) through a non-blocking writer; the returned
//! [`LoggingGuard`] must be held until shutdown so buffered lines get flushed.
//!
//! If the log file cannot be opened, a warning is emitted and logging
//! continues on the terminal only.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::logging::{init_logging, LogFormat, LogLevel, LoggingConfig};
//!
//! let _guard = init_logging(
//!     LoggingConfig::default()
//!         .with_format(LogFormat::Compact)
//!         .with_level(LogLevel::Debug)
//!         .with_log_file("debug.log"),
//! )?;
//!
//! tracing::info!("Application started");
//! ```

use crate::error::{Error, Result};
use serde::Deserialize;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use tracing::Subscriber;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    filter::EnvFilter, layer::SubscriberExt, registry::LookupSpan, util::SubscriberInitExt, Layer,
};

/// Log level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    #[serde(alias = "warning")]
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable pretty format with colors
    Pretty,
    /// Structured JSON format for machine parsing
    Json,
    /// Single-line format, the default for an interactive run
    Compact,
}

impl Default for LogFormat {
    fn default() -> Self {
        Self::Compact
    }
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Terminal output format
    pub format: LogFormat,
    /// Minimum log level
    pub level: LogLevel,
    /// Custom filter string (e.g., "core_auth=debug,core_transfer=trace")
    pub filter: Option<String>,
    /// Append-only log file; terminal only when unset
    pub log_file: Option<PathBuf>,
    /// Display target module in terminal output
    pub display_target: bool,
    /// Colorize terminal output
    pub ansi: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            level: LogLevel::Info,
            filter: None,
            log_file: None,
            display_target: false,
            ansi: true,
        }
    }
}

impl LoggingConfig {
    /// Set log format
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Set minimum log level
    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    /// Set custom filter string
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Mirror every event into an append-only file
    pub fn with_log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_file = Some(path.into());
        self
    }

    /// Enable or disable target display
    pub fn with_target(mut self, display: bool) -> Self {
        self.display_target = display;
        self
    }

    /// Enable or disable terminal colors
    pub fn with_ansi(mut self, ansi: bool) -> Self {
        self.ansi = ansi;
        self
    }
}

/// Keeps the file writer alive; drop it last to flush buffered lines
#[must_use = "dropping the guard stops the log file writer"]
pub struct LoggingGuard {
    file_guard: Option<WorkerGuard>,
    file_error: Option<String>,
}

impl LoggingGuard {
    /// Whether events are also reaching the log file
    pub fn file_enabled(&self) -> bool {
        self.file_guard.is_some()
    }

    /// Why the log file could not be opened, if it couldn't
    pub fn file_error(&self) -> Option<&str> {
        self.file_error.as_deref()
    }
}

impl fmt::Debug for LoggingGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggingGuard")
            .field("file_enabled", &self.file_enabled())
            .field("file_error", &self.file_error)
            .finish()
    }
}

/// Initialize the logging system
///
/// This should be called once during application startup. Subsequent calls
/// will return an error.
///
/// # Errors
///
/// Returns an error if:
/// - Logging is already initialized
/// - The filter string is invalid
///
/// A log file that cannot be opened is not an error; see
/// [`LoggingGuard::file_error`].
pub fn init_logging(config: LoggingConfig) -> Result<LoggingGuard> {
    let filter = build_filter(&config)?;

    let (file_layer, file_guard, file_error) = match config.log_file.as_deref() {
        Some(path) => match open_log_file(path) {
            Ok(appender) => {
                let (writer, guard) = tracing_appender::non_blocking(appender);
                let layer = tracing_subscriber::fmt::layer()
                    .with_writer(writer)
                    .with_ansi(false)
                    .with_target(true);
                (Some(layer), Some(guard), None)
            }
            Err(e) => (None, None, Some(e)),
        },
        None => (None, None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(terminal_layer(&config))
        .with(file_layer)
        .try_init()
        .map_err(|e| Error::Logging(format!("Failed to initialize logging: {}", e)))?;

    if let Some(reason) = &file_error {
        tracing::warn!(reason = %reason, "Log file unavailable, logging to terminal only");
    }

    Ok(LoggingGuard {
        file_guard,
        file_error,
    })
}

fn terminal_layer<S>(config: &LoggingConfig) -> Box<dyn Layer<S> + Send + Sync + 'static>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    let base = tracing_subscriber::fmt::layer()
        .with_writer(io::stderr)
        .with_target(config.display_target)
        .with_ansi(config.ansi);

    match config.format {
        LogFormat::Pretty => base.pretty().boxed(),
        LogFormat::Compact => base.compact().boxed(),
        LogFormat::Json => base.json().flatten_event(true).boxed(),
    }
}

/// Open `path` for appending, creating it if needed
fn open_log_file(path: &Path) -> std::result::Result<RollingFileAppender, String> {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| format!("{} is not a file path", path.display()))?;

    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };

    RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(file_name)
        .build(&directory)
        .map_err(|e| format!("{}: {}", path.display(), e))
}

fn build_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    let base_level = config.level.as_str();

    let filter_string = if let Some(custom_filter) = &config.filter {
        custom_filter.clone()
    } else {
        // Default filter: our crates at specified level, dependencies at warn
        format!(
            "warn,drive_pull={level},core_runtime={level},core_auth={level},\
             core_transfer={level},provider_google_drive={level},bridge_desktop={level},\
             h2=warn,hyper=warn,reqwest=warn,rustls=warn",
            level = base_level
        )
    };

    EnvFilter::try_new(filter_string)
        .map_err(|e| Error::Config(format!("Invalid log filter: {}", e)))
}

/// Helper function to redact sensitive field values
///
/// This should be used when manually constructing log entries:
///
/// ```ignore
/// use tracing::info;
/// use core_runtime::logging::redact_if_sensitive;
///
/// info!(email = %redact_if_sensitive("email", &email), "Signed in");
/// ```
pub fn redact_if_sensitive(field_name: &str, value: &str) -> String {
    const SENSITIVE_FIELDS: &[&str] = &[
        "token",
        "access_token",
        "refresh_token",
        "password",
        "secret",
        "api_key",
        "authorization",
        "bearer",
    ];

    let field_lower = field_name.to_lowercase();
    if SENSITIVE_FIELDS.iter().any(|&f| field_lower.contains(f)) {
        "[REDACTED]".to_string()
    } else if value.contains('@') && value.contains('.') {
        // Likely an email - redact domain but keep first char
        if let Some(at_pos) = value.find('@') {
            format!("{}***@[REDACTED]", &value[..1.min(at_pos)])
        } else {
            value.to_string()
        }
    } else {
        value.to_string()
    }
}

/// Strip full file paths to basename only for privacy
///
/// ```ignore
/// use tracing::info;
/// use core_runtime::logging::strip_path;
///
/// info!(file = %strip_path("/home/ana/pull/report.pdf"), "Saved");
/// // Logs: file="report.pdf"
/// ```
pub fn strip_path(path: &str) -> &str {
    path.rsplit('/')
        .next()
        .unwrap_or(path)
        .rsplit('\\')
        .next()
        .unwrap_or(path)
}
