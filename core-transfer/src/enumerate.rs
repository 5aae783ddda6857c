//! # Source Enumeration
//!
//! Lists the sources an operator can pick and expands a picked source into
//! the files to transfer.
//!
//! A `File` source becomes a single item. `Folder` and `SharedDrive` sources
//! are walked breadth-first over every page; each sub-folder becomes a
//! sub-directory of the destination. A sub-folder that cannot be listed is
//! reported and left alone, but failing to list the picked source itself
//! aborts the run.

use crate::error::{Result, RetryError, TransferError};
use crate::item::TransferItem;
use crate::naming::sanitize_name;
use crate::report::{Reporter, TransferEvent};
use crate::retry::RetryExecutor;
use bridge_traits::storage::{RemoteFile, RemoteSource, SourceKind, StorageProvider};
use std::collections::VecDeque;
use std::path::PathBuf;
use tracing::{debug, info};

/// A remote folder whose listing completed during the walk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkedFolder {
    pub id: String,
    pub name: String,
    /// 0 for the picked source
    pub depth: usize,
}

/// Files found under a source plus the folders that were fully listed
#[derive(Debug, Clone, Default)]
pub struct Collection {
    pub items: Vec<TransferItem>,
    pub folders: Vec<WalkedFolder>,
    /// Sub-folders skipped because they could not be listed
    pub skipped_folders: usize,
}

/// List every source, retrying rate-limited pages
pub async fn list_sources(
    provider: &dyn StorageProvider,
    retry: &RetryExecutor<'_>,
) -> Result<Vec<RemoteSource>> {
    let sources = retry
        .run("list sources", || provider.list_sources())
        .await
        .map_err(|source| TransferError::Listing {
            subject: "sources".to_string(),
            source,
        })?;

    info!(count = sources.len(), "Listed sources");
    Ok(sources)
}

/// Numbered menu, one line per source, starting at 1
pub fn render_menu(sources: &[RemoteSource]) -> String {
    let width = sources.len().to_string().len();
    sources
        .iter()
        .enumerate()
        .map(|(i, source)| {
            format!(
                "{:>width$}. [{}] {}\n",
                i + 1,
                source.kind,
                source.name,
                width = width
            )
        })
        .collect()
}

/// All pages of one folder's children
async fn list_all_children(
    provider: &dyn StorageProvider,
    retry: &RetryExecutor<'_>,
    folder_id: &str,
    folder_name: &str,
) -> std::result::Result<Vec<RemoteFile>, RetryError> {
    let operation = format!("list {}", folder_name);
    let mut children = Vec::new();
    let mut cursor: Option<String> = None;

    loop {
        let (page, next) = retry
            .run(&operation, || provider.list_children(folder_id, cursor.clone()))
            .await?;
        children.extend(page);

        match next {
            Some(next) => cursor = Some(next),
            None => break,
        }
    }

    Ok(children)
}

/// Expand a picked source into transfer items
pub async fn collect_items(
    provider: &dyn StorageProvider,
    retry: &RetryExecutor<'_>,
    reporter: &dyn Reporter,
    source: &RemoteSource,
) -> Result<Collection> {
    let mut collection = Collection::default();

    if !source.kind.is_container() {
        let file = retry
            .run(&format!("get {}", source.name), || provider.get_metadata(&source.id))
            .await
            .map_err(|e| TransferError::Listing {
                subject: source.name.clone(),
                source: e,
            })?;
        collection.items.push(TransferItem::new(file, PathBuf::new()));
        return Ok(collection);
    }

    let mut queue: VecDeque<(WalkedFolder, PathBuf)> = VecDeque::new();
    queue.push_back((
        WalkedFolder {
            id: source.id.clone(),
            name: source.name.clone(),
            depth: 0,
        },
        PathBuf::new(),
    ));

    while let Some((folder, relative_dir)) = queue.pop_front() {
        let children = match list_all_children(provider, retry, &folder.id, &folder.name).await {
            Ok(children) => children,
            Err(e) if folder.depth == 0 => {
                return Err(TransferError::Listing {
                    subject: folder.name,
                    source: e,
                });
            }
            Err(e) => {
                reporter.report(&TransferEvent::ListingFailed {
                    folder: folder.name.clone(),
                    error: e.to_string(),
                });
                collection.skipped_folders += 1;
                continue;
            }
        };

        debug!(folder = %folder.name, count = children.len(), "Listed folder");

        for child in children {
            if child.is_folder {
                let child_dir = relative_dir.join(sanitize_name(&child.name));
                queue.push_back((
                    WalkedFolder {
                        id: child.id,
                        name: child.name,
                        depth: folder.depth + 1,
                    },
                    child_dir,
                ));
            } else {
                collection
                    .items
                    .push(TransferItem::new(child, relative_dir.clone()));
            }
        }

        collection.folders.push(folder);
    }

    Ok(collection)
}
