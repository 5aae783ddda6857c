//! Local copy verification against the remote record

use bridge_traits::error::Result as BridgeResult;
use bridge_traits::storage::{FileSystemAccess, RemoteFile};
use core_runtime::config::VerifyMode;
use md5::Md5;
use sha2::{Digest, Sha256};
use std::path::Path;
use std::sync::Arc;
use tokio::io::AsyncReadExt;

const READ_BUFFER_SIZE: usize = 64 * 1024;

/// Result of comparing a local file with its remote record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    Verified,
    Mismatch(String),
    /// The remote record has nothing to compare against
    Unverifiable(String),
}

impl Verification {
    pub fn is_verified(&self) -> bool {
        matches!(self, Verification::Verified)
    }
}

impl std::fmt::Display for Verification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Verification::Verified => f.write_str("verified"),
            Verification::Mismatch(reason) => write!(f, "mismatch: {}", reason),
            Verification::Unverifiable(reason) => write!(f, "unverifiable: {}", reason),
        }
    }
}

/// Lowercase hex SHA-256 of a local file
pub async fn sha256_file(fs: &dyn FileSystemAccess, path: &Path) -> BridgeResult<String> {
    hash_file::<Sha256>(fs, path).await
}

/// Lowercase hex MD5 of a local file
pub async fn md5_file(fs: &dyn FileSystemAccess, path: &Path) -> BridgeResult<String> {
    hash_file::<Md5>(fs, path).await
}

async fn hash_file<D: Digest + Send>(fs: &dyn FileSystemAccess, path: &Path) -> BridgeResult<String> {
    let mut reader = fs.open_read_stream(path).await?;
    let mut hasher = D::new();
    let mut buffer = vec![0u8; READ_BUFFER_SIZE];

    loop {
        let read = reader.read(&mut buffer).await?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }

    Ok(hex(&hasher.finalize()))
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Checks downloaded files in the configured [`VerifyMode`]
#[derive(Clone)]
pub struct Verifier {
    fs: Arc<dyn FileSystemAccess>,
    mode: VerifyMode,
}

impl Verifier {
    pub fn new(fs: Arc<dyn FileSystemAccess>, mode: VerifyMode) -> Self {
        Self { fs, mode }
    }

    pub fn mode(&self) -> VerifyMode {
        self.mode
    }

    /// Compare the file at `path` with `remote`
    ///
    /// I/O errors while reading the local file are returned as errors, not
    /// as a mismatch.
    pub async fn verify(&self, path: &Path, remote: &RemoteFile) -> BridgeResult<Verification> {
        let local_size = self.fs.metadata(path).await?.size;

        if let Some(expected) = remote.size {
            if expected != local_size {
                return Ok(Verification::Mismatch(format!(
                    "size {} does not match remote {}",
                    local_size, expected
                )));
            }
        }

        match self.mode {
            VerifyMode::Size => match remote.size {
                Some(_) => Ok(Verification::Verified),
                None => Ok(Verification::Unverifiable("remote reports no size".to_string())),
            },
            VerifyMode::Checksum => {
                let (algorithm, expected, actual) = if let Some(expected) =
                    remote.sha256_checksum.as_deref()
                {
                    ("SHA-256", expected, sha256_file(self.fs.as_ref(), path).await?)
                } else if let Some(expected) = remote.md5_checksum.as_deref() {
                    ("MD5", expected, md5_file(self.fs.as_ref(), path).await?)
                } else {
                    return Ok(Verification::Unverifiable(
                        "remote reports no checksum".to_string(),
                    ));
                };

                if actual.eq_ignore_ascii_case(expected) {
                    Ok(Verification::Verified)
                } else {
                    Ok(Verification::Mismatch(format!(
                        "{} {} does not match remote {}",
                        algorithm, actual, expected
                    )))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_desktop::TokioFileSystem;

    const HELLO_SHA256: &str = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";
    const HELLO_MD5: &str = "5d41402abc4b2a76b9719d911017c592";

    async fn setup(contents: &[u8]) -> (tempfile::TempDir, std::path::PathBuf, Arc<dyn FileSystemAccess>) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hello.txt");
        tokio::fs::write(&path, contents).await.unwrap();
        (dir, path, Arc::new(TokioFileSystem::new()))
    }

    #[tokio::test]
    async fn test_sha256_file() {
        let (_dir, path, fs) = setup(b"hello").await;
        assert_eq!(sha256_file(fs.as_ref(), &path).await.unwrap(), HELLO_SHA256);
    }

    #[tokio::test]
    async fn test_checksum_mode() {
        let (_dir, path, fs) = setup(b"hello").await;
        let verifier = Verifier::new(fs, VerifyMode::Checksum);

        let remote = RemoteFile::new("f1", "hello.txt")
            .with_size(5)
            .with_sha256(HELLO_SHA256.to_uppercase());
        assert_eq!(verifier.verify(&path, &remote).await.unwrap(), Verification::Verified);

        let wrong = RemoteFile::new("f1", "hello.txt").with_sha256("00");
        assert!(matches!(
            verifier.verify(&path, &wrong).await.unwrap(),
            Verification::Mismatch(_)
        ));

        let no_checksum = RemoteFile::new("f1", "hello.txt").with_size(5);
        assert!(matches!(
            verifier.verify(&path, &no_checksum).await.unwrap(),
            Verification::Unverifiable(_)
        ));
    }

    #[tokio::test]
    async fn test_md5_used_when_sha256_absent() {
        let (_dir, path, fs) = setup(b"hello").await;
        assert_eq!(md5_file(fs.as_ref(), &path).await.unwrap(), HELLO_MD5);

        let verifier = Verifier::new(fs, VerifyMode::Checksum);

        let remote = RemoteFile::new("f1", "hello.txt")
            .with_size(5)
            .with_md5(HELLO_MD5);
        assert_eq!(verifier.verify(&path, &remote).await.unwrap(), Verification::Verified);

        let wrong = RemoteFile::new("f1", "hello.txt")
            .with_size(5)
            .with_md5("00000000000000000000000000000000");
        assert!(matches!(
            verifier.verify(&path, &wrong).await.unwrap(),
            Verification::Mismatch(ref reason) if reason.starts_with("MD5")
        ));

        // SHA-256 wins when both are reported
        let both = RemoteFile::new("f1", "hello.txt")
            .with_md5("00000000000000000000000000000000")
            .with_sha256(HELLO_SHA256);
        assert!(verifier.verify(&path, &both).await.unwrap().is_verified());
    }

    #[tokio::test]
    async fn test_size_checked_in_both_modes() {
        let (_dir, path, fs) = setup(b"hello").await;
        let remote = RemoteFile::new("f1", "hello.txt")
            .with_size(6)
            .with_sha256(HELLO_SHA256);

        for mode in [VerifyMode::Checksum, VerifyMode::Size] {
            let verifier = Verifier::new(fs.clone(), mode);
            assert!(matches!(
                verifier.verify(&path, &remote).await.unwrap(),
                Verification::Mismatch(ref reason) if reason.contains("size")
            ));
        }
    }

    #[tokio::test]
    async fn test_size_mode() {
        let (_dir, path, fs) = setup(b"hello").await;
        let verifier = Verifier::new(fs, VerifyMode::Size);

        let remote = RemoteFile::new("f1", "hello.txt").with_size(5);
        assert!(verifier.verify(&path, &remote).await.unwrap().is_verified());

        let unknown = RemoteFile::new("f1", "hello.txt");
        assert!(matches!(
            verifier.verify(&path, &unknown).await.unwrap(),
            Verification::Unverifiable(_)
        ));
    }

    #[tokio::test]
    async fn test_missing_local_file_is_error() {
        let (dir, _path, fs) = setup(b"hello").await;
        let verifier = Verifier::new(fs, VerifyMode::Size);
        let remote = RemoteFile::new("f1", "gone.txt").with_size(5);
        assert!(verifier.verify(&dir.path().join("gone.txt"), &remote).await.is_err());
    }
}
