//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for drive-pull:
//! - Logging and tracing infrastructure
//! - Configuration loading with defaults
//!
//! ## Overview
//!
//! This crate contains the runtime utilities that other modules depend on.
//! It establishes the settings every run starts from and the logging
//! conventions used throughout the system.

pub mod config;
pub mod error;
pub mod logging;

pub use config::{AppConfig, LoadedConfig, VerifyMode, CONFIG_FILE};
pub use error::{Error, Result};
pub use logging::{LogFormat, LogLevel, LoggingConfig, LoggingGuard};
