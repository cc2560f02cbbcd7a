//! Uploaded EEG recordings and the "current upload" pointer
//!
//! The most recently stored file becomes the recording the recommendation
//! pipeline reads. Only the pointer is shared state; files stay on disk.
//! Each stored file gets a unique prefix, so two uploads with the same
//! client name never share a path.

use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Invalid file name: {0:?}")]
    InvalidFilename(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Reduce a client-supplied name to its final path component
///
/// Both `/` and `\` count as separators. Returns `None` for names that
/// would not produce a regular file inside the upload directory.
pub fn sanitize_filename(raw: &str) -> Option<String> {
    let name = raw
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or_default()
        .trim();
    if name.is_empty() || name == "." || name == ".." {
        return None;
    }
    Some(name.to_string())
}

/// A recording written to the upload directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredUpload {
    /// Sanitized client file name
    pub filename: String,
    /// `<uuid>_<filename>` under the upload directory
    pub path: PathBuf,
}

/// Owns the upload directory and the current-upload pointer
pub struct UploadRegistry {
    upload_dir: PathBuf,
    current: RwLock<Option<PathBuf>>,
}

impl UploadRegistry {
    pub fn new(upload_dir: PathBuf) -> Self {
        Self {
            upload_dir,
            current: RwLock::new(None),
        }
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    /// Write `bytes` under a fresh prefixed name and make it the current upload
    pub async fn store(&self, filename: &str, bytes: &[u8]) -> Result<StoredUpload, UploadError> {
        let name = sanitize_filename(filename)
            .ok_or_else(|| UploadError::InvalidFilename(filename.to_string()))?;

        tokio::fs::create_dir_all(&self.upload_dir).await?;
        let path = self
            .upload_dir
            .join(format!("{}_{}", Uuid::new_v4().simple(), name));
        tokio::fs::write(&path, bytes).await?;

        info!(file = %name, path = %path.display(), bytes = bytes.len(), "Stored upload");
        self.register(path.clone()).await;
        Ok(StoredUpload {
            filename: name,
            path,
        })
    }

    /// Point the pipeline at an existing recording
    pub async fn register(&self, path: PathBuf) {
        *self.current.write().await = Some(path);
    }

    pub async fn current_upload_path(&self) -> Option<PathBuf> {
        self.current.read().await.clone()
    }
}
