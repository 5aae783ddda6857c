use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Bridge capability not available: {0}")]
    NotAvailable(String),

    #[error("Bridge operation failed: {0}")]
    OperationFailed(String),

    /// The remote side asked us to slow down (HTTP 429, quota 403, transient 5xx).
    #[error("Rate limited (status {status}): {message}")]
    RateLimited { status: u16, message: String },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("HTTP error (status {status}): {message}")]
    Http { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BridgeError {
    /// Whether the operation may succeed if repeated after a delay.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, BridgeError::RateLimited { .. })
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
