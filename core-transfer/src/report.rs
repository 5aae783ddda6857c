//! Progress and outcome reporting
//!
//! The pipeline never prints. It hands typed events to a [`Reporter`], which
//! decides where they go: the tracing subscriber, a progress bar, or an
//! in-memory list for tests.

use crate::item::{OutcomeRecord, RunSummary};
use bridge_traits::storage::SourceKind;
use core_runtime::logging::strip_path;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{info, warn};

/// Something worth telling the operator about
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferEvent {
    RunStarted {
        source: String,
        kind: SourceKind,
        destination: PathBuf,
    },
    ItemsDiscovered {
        count: usize,
    },
    RetryScheduled {
        operation: String,
        attempt: u32,
        max_attempts: u32,
        delay: Duration,
        error: String,
    },
    ItemStarted {
        position: usize,
        total: usize,
        name: String,
    },
    ItemFinished {
        position: usize,
        total: usize,
        record: OutcomeRecord,
    },
    ListingFailed {
        folder: String,
        error: String,
    },
    FolderRemoved {
        folder: String,
    },
    FolderCleanupFailed {
        folder: String,
        error: String,
    },
    RunFinished {
        summary: RunSummary,
    },
}

/// Receives transfer events
///
/// Implementations must not panic and swallow their own failures.
pub trait Reporter: Send + Sync {
    fn report(&self, event: &TransferEvent);
}

/// Writes each event as one tracing event
#[derive(Debug, Clone, Default)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn report(&self, event: &TransferEvent) {
        match event {
            TransferEvent::RunStarted {
                source,
                kind,
                destination,
            } => {
                let destination = destination.to_string_lossy();
                info!(
                    source = %source,
                    kind = %kind,
                    destination = %strip_path(&destination),
                    "Transfer started"
                );
            }
            TransferEvent::ItemsDiscovered { count } => {
                info!(count, "Discovered items to transfer");
            }
            TransferEvent::RetryScheduled {
                operation,
                attempt,
                max_attempts,
                delay,
                error,
            } => {
                warn!(
                    operation = %operation,
                    attempt,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %error,
                    "Rate limited, retrying"
                );
            }
            TransferEvent::ItemStarted { .. } => {}
            TransferEvent::ItemFinished {
                position,
                total,
                record,
            } => {
                let remaining = total.saturating_sub(*position);
                if record.status.is_success() {
                    info!(
                        position,
                        total,
                        remaining,
                        file = %record.name,
                        status = %record.status,
                        "{}",
                        record.detail
                    );
                } else {
                    warn!(
                        position,
                        total,
                        remaining,
                        file = %record.name,
                        status = %record.status,
                        "{}",
                        record.detail
                    );
                }
            }
            TransferEvent::ListingFailed { folder, error } => {
                warn!(folder = %folder, error = %error, "Skipping folder that could not be listed");
            }
            TransferEvent::FolderRemoved { folder } => {
                info!(folder = %folder, "Removed empty remote folder");
            }
            TransferEvent::FolderCleanupFailed { folder, error } => {
                warn!(folder = %folder, error = %error, "Could not remove remote folder");
            }
            TransferEvent::RunFinished { summary } => {
                info!(
                    deleted = summary.deleted,
                    verify_failed = summary.verify_failed,
                    download_failed = summary.download_failed,
                    delete_failed = summary.delete_failed,
                    folders_removed = summary.folders_removed,
                    "Transfer finished"
                );
            }
        }
    }
}

/// Keeps every event in memory
#[derive(Debug, Default)]
pub struct MemoryReporter {
    events: Mutex<Vec<TransferEvent>>,
}

impl MemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<TransferEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    /// Retry events, in order
    pub fn retries(&self) -> Vec<TransferEvent> {
        self.events()
            .into_iter()
            .filter(|e| matches!(e, TransferEvent::RetryScheduled { .. }))
            .collect()
    }

    /// Finished item records, in order
    pub fn outcomes(&self) -> Vec<OutcomeRecord> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                TransferEvent::ItemFinished { record, .. } => Some(record),
                _ => None,
            })
            .collect()
    }
}

impl Reporter for MemoryReporter {
    fn report(&self, event: &TransferEvent) {
        let mut events = match self.events.lock() {
            Ok(events) => events,
            Err(poisoned) => poisoned.into_inner(),
        };
        events.push(event.clone());
    }
}
