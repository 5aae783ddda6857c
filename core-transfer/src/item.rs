//! # Transfer Item State Machine
//!
//! Tracks each remote file through download, verification and deletion.
//!
//! ## State Machine
//!
//! ```text
//! Pending → Downloading → Downloaded → Verifying → Verified → Deleting → Deleted
//!               │                          │                      │
//!               └→ DownloadFailed          └→ VerifyFailed        └→ DeleteFailed
//! ```
//!
//! Transitions only move forward. Deletion can only be reached through
//! `Verified`, so a remote file is never removed without a verified local copy.

use crate::{Result, TransferError};
use bridge_traits::storage::RemoteFile;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ============================================================================
// Work Items
// ============================================================================

/// One remote file queued for transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferItem {
    pub file: RemoteFile,
    /// Directory under the run destination mirroring the remote folders
    pub relative_dir: PathBuf,
}

impl TransferItem {
    pub fn new(file: RemoteFile, relative_dir: impl Into<PathBuf>) -> Self {
        Self {
            file,
            relative_dir: relative_dir.into(),
        }
    }
}

// ============================================================================
// States
// ============================================================================

/// Where an item is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemState {
    Pending,
    Downloading,
    Downloaded,
    Verifying,
    Verified,
    Deleting,
    Deleted,
    DownloadFailed,
    VerifyFailed,
    DeleteFailed,
}

impl ItemState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemState::Pending => "pending",
            ItemState::Downloading => "downloading",
            ItemState::Downloaded => "downloaded",
            ItemState::Verifying => "verifying",
            ItemState::Verified => "verified",
            ItemState::Deleting => "deleting",
            ItemState::Deleted => "deleted",
            ItemState::DownloadFailed => "download-failed",
            ItemState::VerifyFailed => "verify-failed",
            ItemState::DeleteFailed => "delete-failed",
        }
    }

    /// Check if this state ends the item's lifecycle
    pub fn is_terminal(&self) -> bool {
        self.outcome().is_some()
    }

    /// The outcome a terminal state maps to
    pub fn outcome(&self) -> Option<OutcomeStatus> {
        match self {
            ItemState::Deleted => Some(OutcomeStatus::Deleted),
            ItemState::DownloadFailed => Some(OutcomeStatus::DownloadFailed),
            ItemState::VerifyFailed => Some(OutcomeStatus::VerifyFailed),
            ItemState::DeleteFailed => Some(OutcomeStatus::DeleteFailed),
            _ => None,
        }
    }

    fn can_advance_to(&self, to: ItemState) -> bool {
        matches!(
            (self, to),
            (ItemState::Pending, ItemState::Downloading)
                | (ItemState::Downloading, ItemState::Downloaded)
                | (ItemState::Downloading, ItemState::DownloadFailed)
                | (ItemState::Downloaded, ItemState::Verifying)
                | (ItemState::Verifying, ItemState::Verified)
                | (ItemState::Verifying, ItemState::VerifyFailed)
                | (ItemState::Verified, ItemState::Deleting)
                | (ItemState::Deleting, ItemState::Deleted)
                | (ItemState::Deleting, ItemState::DeleteFailed)
        )
    }
}

impl std::fmt::Display for ItemState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Guards the lifecycle of a single item
#[derive(Debug, Clone)]
pub struct ItemTracker {
    file_id: String,
    state: ItemState,
}

impl ItemTracker {
    pub fn new(file_id: impl Into<String>) -> Self {
        Self {
            file_id: file_id.into(),
            state: ItemState::Pending,
        }
    }

    pub fn file_id(&self) -> &str {
        &self.file_id
    }

    pub fn state(&self) -> ItemState {
        self.state
    }

    /// Move to the next state
    ///
    /// # Errors
    ///
    /// Returns `InvalidStateTransition` if the move skips a step, goes
    /// backwards, or leaves a terminal state.
    pub fn advance(&mut self, to: ItemState) -> Result<()> {
        if !self.state.can_advance_to(to) {
            return Err(TransferError::InvalidStateTransition {
                from: self.state.as_str().to_string(),
                to: to.as_str().to_string(),
            });
        }

        self.state = to;
        Ok(())
    }
}

// ============================================================================
// Outcomes
// ============================================================================

/// Terminal status of an item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutcomeStatus {
    Deleted,
    VerifyFailed,
    DownloadFailed,
    DeleteFailed,
}

impl OutcomeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutcomeStatus::Deleted => "deleted",
            OutcomeStatus::VerifyFailed => "verify-failed",
            OutcomeStatus::DownloadFailed => "download-failed",
            OutcomeStatus::DeleteFailed => "delete-failed",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, OutcomeStatus::Deleted)
    }
}

impl std::fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What happened to one item, recorded once when it finishes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeRecord {
    pub file_id: String,
    pub name: String,
    pub status: OutcomeStatus,
    /// Local file, if one was written or reused
    pub local_path: Option<PathBuf>,
    pub detail: String,
}

/// Counts collected over a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub deleted: u64,
    pub verify_failed: u64,
    pub download_failed: u64,
    pub delete_failed: u64,
    pub folders_removed: u64,
    pub folders_skipped: u64,
}

impl RunSummary {
    pub fn record(&mut self, status: OutcomeStatus) {
        match status {
            OutcomeStatus::Deleted => self.deleted += 1,
            OutcomeStatus::VerifyFailed => self.verify_failed += 1,
            OutcomeStatus::DownloadFailed => self.download_failed += 1,
            OutcomeStatus::DeleteFailed => self.delete_failed += 1,
        }
    }

    /// Total items that reached a terminal state
    pub fn total(&self) -> u64 {
        self.deleted + self.verify_failed + self.download_failed + self.delete_failed
    }

    pub fn failed(&self) -> u64 {
        self.total() - self.deleted
    }
}

/// Everything a run produced, in processing order
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub records: Vec<OutcomeRecord>,
    pub summary: RunSummary,
    /// Remote folders removed by the empty-folder cleanup
    pub removed_folders: Vec<String>,
}

impl RunReport {
    pub fn push(&mut self, record: OutcomeRecord) {
        self.summary.record(record.status);
        self.records.push(record);
    }

    pub fn count(&self, status: OutcomeStatus) -> usize {
        self.records.iter().filter(|r| r.status == status).count()
    }
}
