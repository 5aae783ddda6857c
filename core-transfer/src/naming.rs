//! Local file names for remote items

use bridge_traits::storage::RemoteFile;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Suffix of files still being written
pub const PART_SUFFIX: &str = ".part";

/// Make a remote name safe to use as a single path component
///
/// Characters Windows refuses in file names become `_`, and trailing dots
/// and spaces are dropped.
pub fn sanitize_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    let trimmed = cleaned.trim_end_matches(['.', ' ']);
    if trimmed.trim().is_empty() {
        "_".to_string()
    } else {
        trimmed.to_string()
    }
}

/// File name an item is saved under, including the export extension
pub fn local_file_name(file: &RemoteFile) -> String {
    let name = sanitize_name(&file.name);
    match &file.export_as {
        Some(format) => {
            let suffix = format!(".{}", format.extension);
            if name.to_lowercase().ends_with(&suffix.to_lowercase()) {
                name
            } else {
                name + &suffix
            }
        }
        None => name,
    }
}

/// `stem (n).ext` next to `path`
pub fn numbered(path: &Path, n: u32) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let name = match path.extension() {
        Some(ext) => format!("{} ({}).{}", stem, n, ext.to_string_lossy()),
        None => format!("{} ({})", stem, n),
    };
    path.with_file_name(name)
}

/// Staging path a download streams into before it is renamed
pub fn part_path(path: &Path) -> PathBuf {
    let mut name: OsString = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(PART_SUFFIX);
    path.with_file_name(name)
}
