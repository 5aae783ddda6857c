//! # Google Drive Provider
//!
//! Implements `StorageProvider` trait for Google Drive API v3.
//!
//! ## Overview
//!
//! This module provides:
//! - Source listing across My Drive, items shared with the account and shared drives
//! - Paginated folder listing for recursive collection
//! - Streaming downloads, exporting Workspace documents to Office formats
//! - Classification of rate-limit responses so callers can back off

pub mod connector;
pub mod error;
pub mod types;

pub use connector::{DriveAccount, GoogleDriveConnector};
pub use error::{GoogleDriveError, Result};
