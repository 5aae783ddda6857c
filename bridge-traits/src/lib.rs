//! # Host Bridge Traits
//!
//! Platform abstraction traits between the transfer workflow and the outside
//! world.
//!
//! ## Overview
//!
//! Every capability the workflow needs but must not hard-wire is a trait
//! here, so the pipeline can run against fakes in tests and against the
//! desktop implementations in `bridge-desktop` in production.
//!
//! ## Traits
//!
//! ### Networking & I/O
//! - [`HttpClient`](http::HttpClient) - Async HTTP operations, one attempt per call
//! - [`StorageProvider`](storage::StorageProvider) - Remote listing, download and delete
//! - [`FileSystemAccess`](storage::FileSystemAccess) - Local file writes and reads
//!
//! ### Utilities
//! - [`Clock`](time::Clock) - Time source for deterministic testing
//! - [`Sleeper`](time::Sleeper) - Injectable delay for retry backoff
//!
//! ## Error Handling
//!
//! All bridge traits use the [`BridgeError`](error::BridgeError) type.
//! Implementations should:
//!
//! - Convert platform-specific errors to `BridgeError`
//! - Report throttling as `BridgeError::RateLimited` so callers can retry it
//! - Include error context (e.g., file paths, HTTP status)
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so implementations can be shared
//! behind `Arc`.

pub mod error;
pub mod http;
pub mod storage;
pub mod time;

pub use error::BridgeError;

// Re-export commonly used types
pub use http::{DynAsyncRead, HttpClient, HttpMethod, HttpRequest, HttpResponse};
pub use storage::{
    ExportFormat, FileMetadata, FileSystemAccess, RemoteFile, RemoteSource, SourceKind,
    StorageProvider,
};
pub use time::{Clock, FixedClock, Sleeper, SystemClock, TokioSleeper};
