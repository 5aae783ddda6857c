use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Credential file not found: {}", .0.display())]
    CredentialFileMissing(PathBuf),

    #[error("Credential file {} is malformed: {reason}", .path.display())]
    CredentialFileMalformed { path: PathBuf, reason: String },

    #[error("Access token has expired and cannot be refreshed")]
    TokenExpired,

    #[error("Token refresh failed: {0}")]
    TokenRefreshFailed(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),
}

pub type Result<T> = std::result::Result<T, AuthError>;
