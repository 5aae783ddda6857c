use bridge_traits::error::BridgeError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransferError {
    #[error("Invalid state transition from {from} to {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("Listing {subject} failed: {source}")]
    Listing {
        subject: String,
        #[source]
        source: RetryError,
    },

    #[error(transparent)]
    Selection(#[from] SelectionError),
}

/// Operator input that could not be resolved
#[derive(Error, Debug)]
pub enum SelectionError {
    #[error("'{0}' is not a number")]
    NotANumber(String),

    #[error("{index} is out of range, pick 1 to {max}")]
    OutOfRange { index: usize, max: usize },

    #[error("No destination given")]
    EmptyDestination,

    #[error("Destination {0} does not exist")]
    DestinationMissing(PathBuf),

    #[error("Destination {0} is not a directory")]
    NotADirectory(PathBuf),

    #[error("Destination {path} is not writable: {reason}")]
    NotWritable { path: PathBuf, reason: String },

    #[error("Could not read input: {0}")]
    Input(String),
}

impl SelectionError {
    /// Whether the operator can fix this by typing something else
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, SelectionError::Input(_))
    }
}

/// A remote call that did not succeed within the retry policy
#[derive(Error, Debug)]
pub enum RetryError {
    #[error("{operation} still rate limited after {attempts} attempts: {last}")]
    Exhausted {
        operation: String,
        attempts: u32,
        #[source]
        last: BridgeError,
    },

    #[error("{operation} failed: {source}")]
    Failed {
        operation: String,
        #[source]
        source: BridgeError,
    },
}

impl RetryError {
    pub fn is_exhausted(&self) -> bool {
        matches!(self, RetryError::Exhausted { .. })
    }

    /// The error returned by the last attempt
    pub fn last_error(&self) -> &BridgeError {
        match self {
            RetryError::Exhausted { last, .. } => last,
            RetryError::Failed { source, .. } => source,
        }
    }
}

pub type Result<T> = std::result::Result<T, TransferError>;
