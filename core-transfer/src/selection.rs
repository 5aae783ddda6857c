//! Operator selection: source index, destination directory, confirmation
//!
//! Console access sits behind [`Prompter`] so selection can be driven by a
//! script in tests. Nothing here talks to the remote side.

use crate::error::SelectionError;
use bridge_traits::error::BridgeError;
use bridge_traits::storage::{FileSystemAccess, RemoteSource};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Line-oriented operator console
pub trait Prompter: Send {
    /// Show text without waiting for input
    fn show(&mut self, text: &str);

    /// Ask for one line of input
    fn ask(&mut self, prompt: &str) -> Result<String, SelectionError>;

    /// Tell the operator their input was rejected
    fn reject(&mut self, message: &str);
}

/// Resolve typed text to a 0-based index into a list of `count` entries
pub fn resolve_index(input: &str, count: usize) -> Result<usize, SelectionError> {
    let trimmed = input.trim();
    let index: usize = trimmed
        .parse()
        .map_err(|_| SelectionError::NotANumber(trimmed.to_string()))?;

    if index == 0 || index > count {
        return Err(SelectionError::OutOfRange { index, max: count });
    }

    Ok(index - 1)
}

/// Ask until the operator names a listed source
///
/// Only a failure to read input ends the loop with an error.
pub fn select_source(
    prompter: &mut dyn Prompter,
    sources: &[RemoteSource],
) -> Result<RemoteSource, SelectionError> {
    loop {
        let input = prompter.ask(&format!("Select a source (1-{})", sources.len()))?;
        match resolve_index(&input, sources.len()) {
            Ok(index) => {
                let source = sources[index].clone();
                info!(source = %source.name, kind = %source.kind, "Source selected");
                return Ok(source);
            }
            Err(e) => prompter.reject(&e.to_string()),
        }
    }
}

/// Check that `input` names an existing, writable directory
pub async fn validate_destination(
    fs: &dyn FileSystemAccess,
    input: &str,
) -> Result<PathBuf, SelectionError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(SelectionError::EmptyDestination);
    }
    let path = PathBuf::from(trimmed);

    if !fs.exists(&path).await.unwrap_or(false) {
        return Err(SelectionError::DestinationMissing(path));
    }

    let is_directory = fs
        .metadata(&path)
        .await
        .map(|m| m.is_directory)
        .unwrap_or(false);
    if !is_directory {
        return Err(SelectionError::NotADirectory(path));
    }

    fs.ensure_writable(&path)
        .await
        .map_err(|e| not_writable(&path, e))?;

    Ok(path)
}

fn not_writable(path: &Path, error: BridgeError) -> SelectionError {
    SelectionError::NotWritable {
        path: path.to_path_buf(),
        reason: error.to_string(),
    }
}

/// Ask for a destination up to `attempts` times
///
/// # Errors
///
/// The last validation error once the attempts run out, or an input error.
pub async fn select_destination(
    prompter: &mut dyn Prompter,
    fs: &dyn FileSystemAccess,
    attempts: u32,
) -> Result<PathBuf, SelectionError> {
    let mut last_error = SelectionError::EmptyDestination;

    for attempt in 1..=attempts.max(1) {
        let input = prompter.ask("Destination folder")?;
        match validate_destination(fs, &input).await {
            Ok(path) => return Ok(path),
            Err(e) => {
                warn!(attempt, error = %e, "Destination rejected");
                prompter.reject(&e.to_string());
                last_error = e;
            }
        }
    }

    Err(last_error)
}

/// Whether the answer accepts a destructive operation
pub fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "yes" | "y")
}

/// Ask the operator to confirm moving `source` into `destination`
pub fn confirm(
    prompter: &mut dyn Prompter,
    source: &RemoteSource,
    destination: &Path,
) -> Result<bool, SelectionError> {
    let answer = prompter.ask(&format!(
        "Download {} '{}' to {} and delete it from Drive? (yes/no)",
        source.kind,
        source.name,
        destination.display()
    ))?;

    Ok(is_affirmative(&answer))
}
