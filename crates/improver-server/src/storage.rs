//! Upload and output files on disk.
//!
//! Uploads are saved as `{YYYYmmdd_HHMMSS}_{name}`; improved protocols as
//! `improved_{name}_{YYYYmmdd_HHMMSS}.txt`. Names are only timestamp
//! qualified, so two writes of the same name within a second overwrite.

use chrono::Local;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Upload and output directories
#[derive(Debug, Clone)]
pub struct FileStorage {
    upload_dir: PathBuf,
    output_dir: PathBuf,
}

impl FileStorage {
    /// Create storage over existing directories
    pub fn new(upload_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            upload_dir: upload_dir.into(),
            output_dir: output_dir.into(),
        }
    }

    /// Save an upload and return the name it was stored under
    pub async fn save_upload(&self, original_filename: &str, bytes: &[u8]) -> io::Result<String> {
        let stored = format!("{}_{}", Local::now().format(TIMESTAMP_FORMAT), original_filename);
        tokio::fs::write(self.upload_dir.join(&stored), bytes).await?;
        debug!(stored = %stored, size = bytes.len(), "Saved upload");
        Ok(stored)
    }

    /// Delete a saved upload; a missing file is not an error
    pub async fn remove_upload(&self, stored_filename: &str) {
        match tokio::fs::remove_file(self.upload_dir.join(stored_filename)).await {
            Ok(()) => debug!(stored = %stored_filename, "Removed upload"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(stored = %stored_filename, error = %e, "Failed to remove upload"),
        }
    }

    /// Write an improved protocol and return its filename
    pub async fn save_output(&self, source_filename: &str, text: &str) -> io::Result<String> {
        let name = format!(
            "improved_{}_{}.txt",
            source_filename,
            Local::now().format(TIMESTAMP_FORMAT)
        );
        tokio::fs::write(self.output_dir.join(&name), text.as_bytes()).await?;
        debug!(output = %name, "Saved improved protocol");
        Ok(name)
    }

    /// Path of an output file, or `None` if the name could escape the directory
    pub fn output_path(&self, filename: &str) -> Option<PathBuf> {
        if is_plain_filename(filename) {
            Some(self.output_dir.join(filename))
        } else {
            None
        }
    }

    /// Number of saved uploads
    pub async fn count_uploads(&self) -> io::Result<usize> {
        count_files(&self.upload_dir).await
    }

    /// Number of improved protocols written
    pub async fn count_outputs(&self) -> io::Result<usize> {
        count_files(&self.output_dir).await
    }
}

/// Whether `name` is a single path component
pub fn is_plain_filename(name: &str) -> bool {
    !name.is_empty() && !name.contains('/') && !name.contains('\\') && !name.contains("..")
}

/// Final component of a client-supplied filename
pub fn client_basename(name: &str) -> &str {
    name.rsplit(&['/', '\\'][..]).next().unwrap_or(name).trim()
}

async fn count_files(dir: &Path) -> io::Result<usize> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut count = 0;
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_file() {
            count += 1;
        }
    }
    Ok(count)
}
