//! Error types for Google Drive provider

use bridge_traits::error::BridgeError;
use thiserror::Error;

use crate::types::ApiErrorResponse;

/// 403 reasons that mean "slow down" rather than "forbidden"
const RATE_LIMIT_REASONS: &[&str] = &["rateLimitExceeded", "userRateLimitExceeded"];

/// Statuses that always signal throttling or a transient server fault
const RATE_LIMIT_STATUSES: &[u16] = &[429, 500, 502, 503, 504];

/// Google Drive provider errors
#[derive(Error, Debug)]
pub enum GoogleDriveError {
    /// Authentication failed or token is invalid
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// API request returned an error
    #[error("Google Drive API error (status {status_code}): {message}")]
    ApiError { status_code: u16, message: String },

    /// Rate limit exceeded or transient server error
    #[error("Rate limit exceeded (status {status_code}): {message}")]
    RateLimitExceeded { status_code: u16, message: String },

    /// File not found
    #[error("File not found: {file_id}")]
    FileNotFound { file_id: String },

    /// Failed to parse API response
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Item has no downloadable content
    #[error("{name} ({mime_type}) cannot be downloaded or exported")]
    NotDownloadable { name: String, mime_type: String },

    /// Bridge error
    #[error(transparent)]
    BridgeError(#[from] BridgeError),
}

/// Result type for Google Drive operations
pub type Result<T> = std::result::Result<T, GoogleDriveError>;

impl GoogleDriveError {
    /// Classify a non-success API response
    ///
    /// `subject` names what the request was about (usually a file id) and is
    /// used for not-found errors.
    pub fn from_response(status: u16, body: &[u8], subject: &str) -> Self {
        let parsed = ApiErrorResponse::parse(body);
        let message = parsed
            .as_ref()
            .and_then(|p| p.error.message.clone())
            .unwrap_or_else(|| String::from_utf8_lossy(body).trim().to_string());

        let rate_limit_reason = parsed
            .as_ref()
            .is_some_and(|p| p.reasons().any(|r| RATE_LIMIT_REASONS.contains(&r)));

        match status {
            401 => GoogleDriveError::AuthenticationFailed(message),
            404 => GoogleDriveError::FileNotFound {
                file_id: subject.to_string(),
            },
            403 if rate_limit_reason => GoogleDriveError::RateLimitExceeded {
                status_code: status,
                message,
            },
            s if RATE_LIMIT_STATUSES.contains(&s) => GoogleDriveError::RateLimitExceeded {
                status_code: status,
                message,
            },
            _ => GoogleDriveError::ApiError {
                status_code: status,
                message,
            },
        }
    }

    /// Re-classify an HTTP error surfaced by a streaming download
    pub fn from_bridge(error: BridgeError, subject: &str) -> Self {
        match error {
            BridgeError::Http { status, message } => {
                Self::from_response(status, message.as_bytes(), subject)
            }
            other => GoogleDriveError::BridgeError(other),
        }
    }
}

impl From<GoogleDriveError> for BridgeError {
    fn from(error: GoogleDriveError) -> Self {
        match error {
            GoogleDriveError::AuthenticationFailed(msg) => BridgeError::Unauthorized(msg),
            GoogleDriveError::ApiError {
                status_code,
                message,
            } => BridgeError::Http {
                status: status_code,
                message,
            },
            GoogleDriveError::RateLimitExceeded {
                status_code,
                message,
            } => BridgeError::RateLimited {
                status: status_code,
                message,
            },
            GoogleDriveError::FileNotFound { file_id } => BridgeError::NotFound(file_id),
            GoogleDriveError::ParseError(msg) => {
                BridgeError::OperationFailed(format!("Parse error: {}", msg))
            }
            e @ GoogleDriveError::NotDownloadable { .. } => {
                BridgeError::OperationFailed(e.to_string())
            }
            GoogleDriveError::BridgeError(e) => e,
        }
    }
}
