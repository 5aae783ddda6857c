//! # Transfer Module
//!
//! Pulls files out of a storage provider: enumerate, download, verify, delete.
//!
//! ## Overview
//!
//! This module owns the workflow between an authenticated provider and the
//! local file system:
//! - Listing sources and expanding a picked one into files
//! - Resolving operator input behind a `Prompter`
//! - Downloading, verifying and only then deleting each file
//! - Bounded retry of rate-limited calls
//!
//! ## Components
//!
//! - **Item State Machine** (`item`): per-file lifecycle with validated transitions
//! - **Retry** (`retry`): pure backoff policy plus an executor with an injected sleeper
//! - **Enumeration** (`enumerate`): source listing, menu rendering, recursive collection
//! - **Selection** (`selection`): index, destination and confirmation prompts
//! - **Verification** (`verify`): SHA-256 and size checks
//! - **Pipeline** (`pipeline`): the transfer-verify-delete loop
//! - **Reporting** (`report`): typed events for logs and progress

pub mod enumerate;
pub mod error;
pub mod item;
pub mod naming;
pub mod pipeline;
pub mod report;
pub mod retry;
pub mod selection;
pub mod verify;

pub use enumerate::{collect_items, list_sources, render_menu, Collection, WalkedFolder};
pub use error::{Result, RetryError, SelectionError, TransferError};
pub use item::{
    ItemState, ItemTracker, OutcomeRecord, OutcomeStatus, RunReport, RunSummary, TransferItem,
};
pub use pipeline::TransferPipeline;
pub use report::{MemoryReporter, Reporter, TracingReporter, TransferEvent};
pub use retry::{ErrorClass, RetryDecision, RetryExecutor, RetryPolicy};
pub use selection::{
    confirm, is_affirmative, resolve_index, select_destination, select_source,
    validate_destination, Prompter,
};
pub use verify::{md5_file, sha256_file, Verification, Verifier};
