//! # Transfer Pipeline
//!
//! Moves a picked source from Drive to a local directory, one item at a time.
//!
//! ## Workflow
//!
//! For each item:
//! 1. Download into `<target>.part` and rename onto the target, unless an
//!    earlier copy already verifies and can be reused
//! 2. Verify the local copy against the remote record
//! 3. Delete the remote file, only if verification succeeded
//!
//! Rate-limited calls are retried under the [`RetryPolicy`]; any other
//! failure finishes the item and the run moves on. Existing local files are
//! never overwritten: a name already taken gets a ` (n)` suffix.
//!
//! When cleanup is enabled and the source is a folder, walked folders that
//! list empty afterwards are removed deepest-first.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let pipeline = TransferPipeline::new(provider, fs, sleeper, reporter)
//!     .with_retry_policy(RetryPolicy::from_config(&config))
//!     .with_verify_mode(config.verify_mode);
//!
//! let report = pipeline.run(&source, &destination).await?;
//! println!("{} deleted", report.summary.deleted);
//! ```

use crate::enumerate::{collect_items, WalkedFolder};
use crate::error::Result;
use crate::item::{
    ItemState, ItemTracker, OutcomeRecord, OutcomeStatus, RunReport, TransferItem,
};
use crate::naming::{local_file_name, numbered, part_path};
use crate::report::{Reporter, TransferEvent};
use crate::retry::{RetryExecutor, RetryPolicy};
use crate::verify::{Verification, Verifier};
use bridge_traits::storage::{FileSystemAccess, RemoteSource, SourceKind, StorageProvider};
use bridge_traits::time::Sleeper;
use core_runtime::config::VerifyMode;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Upper bound on ` (n)` suffixes tried for one name
const MAX_NAME_SUFFIX: u32 = 10_000;

/// Where an item's bytes will live locally
#[derive(Debug, Clone, PartialEq, Eq)]
enum Target {
    /// Nothing there yet; download into it
    Fresh(PathBuf),
    /// A previous copy that already matches the remote record
    Reuse(PathBuf),
}

/// Download, verify, then delete
pub struct TransferPipeline {
    provider: Arc<dyn StorageProvider>,
    fs: Arc<dyn FileSystemAccess>,
    sleeper: Arc<dyn Sleeper>,
    reporter: Arc<dyn Reporter>,
    retry_policy: RetryPolicy,
    verifier: Verifier,
    delete_empty_folders: bool,
}

impl TransferPipeline {
    pub fn new(
        provider: Arc<dyn StorageProvider>,
        fs: Arc<dyn FileSystemAccess>,
        sleeper: Arc<dyn Sleeper>,
        reporter: Arc<dyn Reporter>,
    ) -> Self {
        let verifier = Verifier::new(fs.clone(), VerifyMode::default());
        Self {
            provider,
            fs,
            sleeper,
            reporter,
            retry_policy: RetryPolicy::default(),
            verifier,
            delete_empty_folders: true,
        }
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    pub fn with_verify_mode(mut self, mode: VerifyMode) -> Self {
        self.verifier = Verifier::new(self.fs.clone(), mode);
        self
    }

    pub fn with_folder_cleanup(mut self, enabled: bool) -> Self {
        self.delete_empty_folders = enabled;
        self
    }

    fn retry(&self) -> RetryExecutor<'_> {
        RetryExecutor::new(self.retry_policy, self.sleeper.as_ref(), self.reporter.as_ref())
    }

    /// Transfer everything under `source` into `destination`
    ///
    /// # Errors
    ///
    /// Only setup failures are errors: the source itself cannot be listed, or
    /// an item broke the state machine. Item failures end up in the report.
    #[instrument(skip(self, source, destination), fields(source = %source.name))]
    pub async fn run(&self, source: &RemoteSource, destination: &Path) -> Result<RunReport> {
        self.reporter.report(&TransferEvent::RunStarted {
            source: source.name.clone(),
            kind: source.kind,
            destination: destination.to_path_buf(),
        });

        let retry = self.retry();
        let collection =
            collect_items(self.provider.as_ref(), &retry, self.reporter.as_ref(), source).await?;

        let total = collection.items.len();
        self.reporter
            .report(&TransferEvent::ItemsDiscovered { count: total });

        let mut report = RunReport::default();
        report.summary.folders_skipped = collection.skipped_folders as u64;
        let mut claimed: HashSet<PathBuf> = HashSet::new();

        for (index, item) in collection.items.iter().enumerate() {
            let position = index + 1;
            self.reporter.report(&TransferEvent::ItemStarted {
                position,
                total,
                name: item.file.name.clone(),
            });

            let record = self.process_item(item, destination, &mut claimed).await?;

            self.reporter.report(&TransferEvent::ItemFinished {
                position,
                total,
                record: record.clone(),
            });
            report.push(record);
        }

        if self.delete_empty_folders && source.kind == SourceKind::Folder {
            report.removed_folders = self.remove_empty_folders(collection.folders).await;
            report.summary.folders_removed = report.removed_folders.len() as u64;
        }

        self.reporter.report(&TransferEvent::RunFinished {
            summary: report.summary,
        });
        Ok(report)
    }

    /// Drive one item to a terminal state
    async fn process_item(
        &self,
        item: &TransferItem,
        destination: &Path,
        claimed: &mut HashSet<PathBuf>,
    ) -> Result<OutcomeRecord> {
        let file = &item.file;
        let mut tracker = ItemTracker::new(&file.id);
        tracker.advance(ItemState::Downloading)?;

        let finish = |tracker: &ItemTracker, local_path: Option<PathBuf>, detail: String| {
            OutcomeRecord {
                file_id: file.id.clone(),
                name: file.name.clone(),
                status: tracker
                    .state()
                    .outcome()
                    .unwrap_or(OutcomeStatus::DownloadFailed),
                local_path,
                detail,
            }
        };

        // Download
        let path = match self.download(item, destination, claimed).await {
            Ok((path, reused)) => {
                tracker.advance(ItemState::Downloaded)?;
                if reused {
                    debug!(file = %file.name, "Reusing verified local copy");
                }
                path
            }
            Err(detail) => {
                tracker.advance(ItemState::DownloadFailed)?;
                return Ok(finish(&tracker, None, detail));
            }
        };

        // Verify
        tracker.advance(ItemState::Verifying)?;
        let verification = match self.verifier.verify(&path, file).await {
            Ok(verification) => verification,
            Err(e) => Verification::Unverifiable(format!("could not read local copy: {}", e)),
        };
        if !verification.is_verified() {
            tracker.advance(ItemState::VerifyFailed)?;
            return Ok(finish(
                &tracker,
                Some(path),
                format!("{}; remote copy kept", verification),
            ));
        }
        tracker.advance(ItemState::Verified)?;

        // Delete
        tracker.advance(ItemState::Deleting)?;
        let operation = format!("delete {}", file.name);
        let provider = self.provider.as_ref();
        match self
            .retry()
            .run(&operation, || provider.delete(&file.id))
            .await
        {
            Ok(()) => {
                tracker.advance(ItemState::Deleted)?;
                Ok(finish(
                    &tracker,
                    Some(path),
                    "downloaded, verified and removed from Drive".to_string(),
                ))
            }
            Err(e) => {
                tracker.advance(ItemState::DeleteFailed)?;
                Ok(finish(&tracker, Some(path), format!("{}; local copy kept", e)))
            }
        }
    }

    /// Get the item's bytes on disk
    ///
    /// Returns the local path and whether an existing copy was reused, or a
    /// failure detail.
    async fn download(
        &self,
        item: &TransferItem,
        destination: &Path,
        claimed: &mut HashSet<PathBuf>,
    ) -> std::result::Result<(PathBuf, bool), String> {
        let file = &item.file;
        if !file.downloadable {
            return Err(format!(
                "{} cannot be downloaded or exported",
                file.mime_type.as_deref().unwrap_or("this type")
            ));
        }

        let dir = destination.join(&item.relative_dir);
        self.fs
            .create_dir_all(&dir)
            .await
            .map_err(|e| format!("could not create {}: {}", dir.display(), e))?;

        let path = match self.resolve_target(&dir.join(local_file_name(file)), item, claimed).await? {
            Target::Reuse(path) => {
                claimed.insert(path.clone());
                return Ok((path, true));
            }
            Target::Fresh(path) => path,
        };
        claimed.insert(path.clone());

        let part = part_path(&path);
        let provider = self.provider.as_ref();
        let fs = self.fs.as_ref();
        let part_ref = part.as_path();
        let operation = format!("download {}", file.name);

        let written = self
            .retry()
            .run(&operation, || async move {
                let reader = provider.open_download(file).await?;
                fs.write_stream(part_ref, reader).await
            })
            .await;

        let written = match written {
            Ok(written) => written,
            Err(e) => {
                self.discard(&part).await;
                return Err(e.to_string());
            }
        };

        if let Err(e) = self.fs.rename(&part, &path).await {
            self.discard(&part).await;
            return Err(format!("could not move download into place: {}", e));
        }

        debug!(file = %file.name, bytes = written, "Downloaded");
        Ok((path, false))
    }

    /// Pick the path for an item without overwriting anything
    async fn resolve_target(
        &self,
        base: &Path,
        item: &TransferItem,
        claimed: &HashSet<PathBuf>,
    ) -> std::result::Result<Target, String> {
        for n in 0..=MAX_NAME_SUFFIX {
            let candidate = if n == 0 {
                base.to_path_buf()
            } else {
                numbered(base, n)
            };

            if claimed.contains(&candidate) {
                continue;
            }

            let exists = self
                .fs
                .exists(&candidate)
                .await
                .map_err(|e| format!("could not inspect {}: {}", candidate.display(), e))?;
            if !exists {
                return Ok(Target::Fresh(candidate));
            }

            let matches = self
                .verifier
                .verify(&candidate, &item.file)
                .await
                .map(|v| v.is_verified())
                .unwrap_or(false);
            if matches {
                return Ok(Target::Reuse(candidate));
            }
        }

        Err(format!("no free file name for {}", base.display()))
    }

    async fn discard(&self, part: &Path) {
        if let Ok(true) = self.fs.exists(part).await {
            if let Err(e) = self.fs.delete_file(part).await {
                warn!(error = %e, "Could not remove partial download");
            }
        }
    }

    /// Delete walked folders that list empty, deepest first
    async fn remove_empty_folders(&self, mut folders: Vec<WalkedFolder>) -> Vec<String> {
        folders.sort_by(|a, b| b.depth.cmp(&a.depth));

        let retry = self.retry();
        let provider = self.provider.as_ref();
        let mut removed = Vec::new();

        for folder in folders {
            let folder_id = folder.id.as_str();
            let listing = retry
                .run(&format!("list {}", folder.name), || {
                    provider.list_children(folder_id, None)
                })
                .await;

            let is_empty = match listing {
                Ok((children, next)) => children.is_empty() && next.is_none(),
                Err(e) => {
                    self.reporter.report(&TransferEvent::FolderCleanupFailed {
                        folder: folder.name.clone(),
                        error: e.to_string(),
                    });
                    continue;
                }
            };

            if !is_empty {
                debug!(folder = %folder.name, "Keeping non-empty folder");
                continue;
            }

            match retry
                .run(&format!("delete {}", folder.name), || provider.delete(folder_id))
                .await
            {
                Ok(()) => {
                    self.reporter.report(&TransferEvent::FolderRemoved {
                        folder: folder.name.clone(),
                    });
                    removed.push(folder.name);
                }
                Err(e) => self.reporter.report(&TransferEvent::FolderCleanupFailed {
                    folder: folder.name.clone(),
                    error: e.to_string(),
                }),
            }
        }

        info!(count = removed.len(), "Empty folder cleanup finished");
        removed
    }
}
