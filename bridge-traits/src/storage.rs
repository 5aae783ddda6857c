//! Storage and File System Abstractions
//!
//! Provides the remote storage contract consumed by the transfer workflow and
//! the local file system access it writes through.

use async_trait::async_trait;
use std::fmt;
use std::path::Path;

use crate::error::Result;
use crate::http::DynAsyncRead;

/// What kind of entity a listed source is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    File,
    Folder,
    SharedDrive,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::File => "file",
            SourceKind::Folder => "folder",
            SourceKind::SharedDrive => "shared drive",
        }
    }

    /// Whether the source has children to walk
    pub fn is_container(&self) -> bool {
        matches!(self, SourceKind::Folder | SourceKind::SharedDrive)
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A listable remote entity the operator can pick
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteSource {
    pub kind: SourceKind,
    pub id: String,
    pub name: String,
    pub mime_type: Option<String>,
}

impl RemoteSource {
    pub fn new(kind: SourceKind, id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
            name: name.into(),
            mime_type: None,
        }
    }
}

/// Format a document has to be converted to before it can be downloaded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFormat {
    pub mime_type: String,
    /// Extension appended to the local file name, without the dot
    pub extension: String,
}

/// Remote file information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    pub id: String,
    pub name: String,
    pub mime_type: Option<String>,
    pub size: Option<u64>,
    pub modified_at: Option<i64>,
    pub is_folder: bool,
    pub parent_ids: Vec<String>,
    pub md5_checksum: Option<String>,
    pub sha256_checksum: Option<String>,
    /// Key required to access some link-shared files
    pub resource_key: Option<String>,
    /// Set when the content must be exported rather than fetched as-is
    pub export_as: Option<ExportFormat>,
    /// False for provider-native objects with no byte content (forms, shortcuts)
    pub downloadable: bool,
}

impl RemoteFile {
    /// Minimal downloadable file, mostly useful in tests
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            mime_type: None,
            size: None,
            modified_at: None,
            is_folder: false,
            parent_ids: Vec::new(),
            md5_checksum: None,
            sha256_checksum: None,
            resource_key: None,
            export_as: None,
            downloadable: true,
        }
    }

    pub fn folder(id: impl Into<String>, name: impl Into<String>) -> Self {
        let mut file = Self::new(id, name);
        file.is_folder = true;
        file.downloadable = false;
        file
    }

    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    pub fn with_md5(mut self, checksum: impl Into<String>) -> Self {
        self.md5_checksum = Some(checksum.into());
        self
    }

    pub fn with_sha256(mut self, checksum: impl Into<String>) -> Self {
        self.sha256_checksum = Some(checksum.into());
        self
    }
}

/// Remote storage provider
///
/// One call per remote request; implementations must not retry internally.
/// Rate-limit responses are reported as
/// [`BridgeError::RateLimited`](crate::error::BridgeError::RateLimited).
#[async_trait]
pub trait StorageProvider: Send + Sync {
    /// List every source the account can pick from (all pages)
    async fn list_sources(&self) -> Result<Vec<RemoteSource>>;

    /// List one page of the children of a folder or shared drive
    ///
    /// Returns the page and the cursor for the next one, if any.
    async fn list_children(
        &self,
        parent_id: &str,
        cursor: Option<String>,
    ) -> Result<(Vec<RemoteFile>, Option<String>)>;

    /// Fetch metadata for a single file
    async fn get_metadata(&self, file_id: &str) -> Result<RemoteFile>;

    /// Open the content of a file as a byte stream
    async fn open_download(&self, file: &RemoteFile) -> Result<Box<DynAsyncRead>>;

    /// Permanently delete a file or folder
    async fn delete(&self, file_id: &str) -> Result<()>;
}

/// File metadata information
#[derive(Debug, Clone)]
pub struct FileMetadata {
    pub size: u64,
    pub modified_at: Option<i64>,
    pub is_directory: bool,
}

/// Local file system access
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::FileSystemAccess;
///
/// async fn save(fs: &dyn FileSystemAccess, dir: &Path, reader: Box<DynAsyncRead>) -> Result<u64> {
///     fs.create_dir_all(dir).await?;
///     fs.write_stream(&dir.join("data.bin"), reader).await
/// }
/// ```
#[async_trait]
pub trait FileSystemAccess: Send + Sync {
    /// Check if a file or directory exists
    async fn exists(&self, path: &Path) -> Result<bool>;

    /// Get metadata for a file or directory
    async fn metadata(&self, path: &Path) -> Result<FileMetadata>;

    /// Create a directory and all parent directories if they don't exist
    async fn create_dir_all(&self, path: &Path) -> Result<()>;

    /// Stream data into a file, truncating it if it exists
    ///
    /// Returns the number of bytes written. Data is flushed to disk before
    /// returning.
    async fn write_stream(&self, path: &Path, reader: Box<DynAsyncRead>) -> Result<u64>;

    /// Open a file for streaming reads
    async fn open_read_stream(&self, path: &Path) -> Result<Box<DynAsyncRead>>;

    /// Rename a file, replacing the target
    async fn rename(&self, from: &Path, to: &Path) -> Result<()>;

    /// Delete a file
    async fn delete_file(&self, path: &Path) -> Result<()>;

    /// Fail unless new files can be created inside `dir`
    async fn ensure_writable(&self, dir: &Path) -> Result<()>;
}
