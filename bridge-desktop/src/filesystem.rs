//! File System Access Implementation using Tokio

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    http::DynAsyncRead,
    storage::{FileMetadata, FileSystemAccess},
};
use std::path::Path;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Name of the probe file used to check that a directory accepts writes
const WRITE_PROBE_NAME: &str = ".drive-pull-write-probe";

/// Tokio-based file system implementation
///
/// Provides async file I/O operations using `tokio::fs`.
#[derive(Debug, Clone, Default)]
pub struct TokioFileSystem;

impl TokioFileSystem {
    pub fn new() -> Self {
        Self
    }

    /// Convert std::io::Error to BridgeError
    fn map_io_error(e: std::io::Error) -> BridgeError {
        BridgeError::Io(e)
    }
}

#[async_trait]
impl FileSystemAccess for TokioFileSystem {
    async fn exists(&self, path: &Path) -> Result<bool> {
        fs::try_exists(path).await.map_err(Self::map_io_error)
    }

    async fn metadata(&self, path: &Path) -> Result<FileMetadata> {
        let metadata = fs::metadata(path).await.map_err(Self::map_io_error)?;

        Ok(FileMetadata {
            size: metadata.len(),
            modified_at: metadata
                .modified()
                .ok()
                .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
                .map(|d| d.as_secs() as i64),
            is_directory: metadata.is_dir(),
        })
    }

    async fn create_dir_all(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path)
            .await
            .map_err(Self::map_io_error)?;
        debug!(path = ?path, "Created directory");
        Ok(())
    }

    async fn write_stream(&self, path: &Path, mut reader: Box<DynAsyncRead>) -> Result<u64> {
        if let Some(parent) = path.parent() {
            self.create_dir_all(parent).await?;
        }

        let mut file = fs::File::create(path).await.map_err(Self::map_io_error)?;
        let written = tokio::io::copy(&mut reader, &mut file)
            .await
            .map_err(Self::map_io_error)?;
        file.flush().await.map_err(Self::map_io_error)?;
        file.sync_all().await.map_err(Self::map_io_error)?;

        debug!(path = ?path, size = written, "Wrote file");
        Ok(written)
    }

    async fn open_read_stream(&self, path: &Path) -> Result<Box<DynAsyncRead>> {
        let file = fs::File::open(path).await.map_err(Self::map_io_error)?;
        debug!(path = ?path, "Opened file for reading");
        Ok(Box::new(file))
    }

    async fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        fs::rename(from, to).await.map_err(Self::map_io_error)?;
        debug!(from = ?from, to = ?to, "Renamed file");
        Ok(())
    }

    async fn delete_file(&self, path: &Path) -> Result<()> {
        fs::remove_file(path).await.map_err(Self::map_io_error)?;
        debug!(path = ?path, "Deleted file");
        Ok(())
    }

    async fn ensure_writable(&self, dir: &Path) -> Result<()> {
        let probe = dir.join(format!("{}-{}", WRITE_PROBE_NAME, std::process::id()));

        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&probe)
            .await
            .map_err(Self::map_io_error)?;
        let write_result = file.write_all(b"probe").await;
        drop(file);

        fs::remove_file(&probe).await.map_err(Self::map_io_error)?;
        write_result.map_err(Self::map_io_error)?;

        debug!(path = ?dir, "Directory is writable");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn test_write_stream_and_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let fs = TokioFileSystem::new();
        let path = dir.path().join("nested").join("file.txt");

        let reader: Box<DynAsyncRead> = Box::new(std::io::Cursor::new(b"Hello, World!".to_vec()));
        let written = fs.write_stream(&path, reader).await.unwrap();
        assert_eq!(written, 13);

        let mut read_back = String::new();
        fs.open_read_stream(&path)
            .await
            .unwrap()
            .read_to_string(&mut read_back)
            .await
            .unwrap();
        assert_eq!(read_back, "Hello, World!");

        let metadata = fs.metadata(&path).await.unwrap();
        assert_eq!(metadata.size, 13);
        assert!(!metadata.is_directory);
    }

    #[tokio::test]
    async fn test_rename_and_delete() {
        let dir = tempfile::tempdir().unwrap();
        let fs = TokioFileSystem::new();
        let from = dir.path().join("a.part");
        let to = dir.path().join("a");

        let reader: Box<DynAsyncRead> = Box::new(std::io::Cursor::new(vec![1u8, 2, 3]));
        fs.write_stream(&from, reader).await.unwrap();
        fs.rename(&from, &to).await.unwrap();

        assert!(!fs.exists(&from).await.unwrap());
        assert!(fs.exists(&to).await.unwrap());

        fs.delete_file(&to).await.unwrap();
        assert!(!fs.exists(&to).await.unwrap());
    }

    #[tokio::test]
    async fn test_ensure_writable_leaves_no_probe() {
        let dir = tempfile::tempdir().unwrap();
        let fs = TokioFileSystem::new();

        fs.ensure_writable(dir.path()).await.unwrap();

        let mut entries = std::fs::read_dir(dir.path()).unwrap();
        assert!(entries.next().is_none());
    }

    #[tokio::test]
    async fn test_ensure_writable_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let fs = TokioFileSystem::new();

        let result = fs.ensure_writable(&dir.path().join("missing")).await;
        assert!(matches!(result, Err(BridgeError::Io(_))));
    }
}
