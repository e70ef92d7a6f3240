//! File system access for desktop hosts, built on `tokio::fs`.

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    storage::{FileMetadata, FileSystemAccess},
};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

const APP_DIR_NAME: &str = "pocket-player";

/// Tokio-based file system implementation.
///
/// The data directory follows platform conventions via `dirs`:
/// `~/.local/share/pocket-player` on Linux,
/// `~/Library/Application Support/pocket-player` on macOS.
pub struct TokioFileSystem {
    data_dir: PathBuf,
}

impl TokioFileSystem {
    pub fn new() -> Self {
        let data_dir = dirs::data_dir()
            .unwrap_or_else(|| {
                dirs::home_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join(".local")
                    .join("share")
            })
            .join(APP_DIR_NAME);

        Self { data_dir }
    }

    /// Use an explicit data directory, mostly for tests and sandboxed hosts.
    pub fn with_data_directory(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    async fn ensure_dir(dir: &Path) -> Result<()> {
        if !fs::try_exists(dir).await.map_err(BridgeError::Io)? {
            fs::create_dir_all(dir).await.map_err(BridgeError::Io)?;
            debug!(path = ?dir, "Created app directory");
        }
        Ok(())
    }
}

impl Default for TokioFileSystem {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FileSystemAccess for TokioFileSystem {
    async fn get_data_directory(&self) -> Result<PathBuf> {
        Self::ensure_dir(&self.data_dir).await?;
        Ok(self.data_dir.clone())
    }

    async fn exists(&self, path: &Path) -> Result<bool> {
        fs::try_exists(path).await.map_err(BridgeError::Io)
    }

    async fn metadata(&self, path: &Path) -> Result<FileMetadata> {
        let metadata = fs::metadata(path).await?;

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
        fs::create_dir_all(path).await?;
        Ok(())
    }

    async fn list_directory(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let mut entries = Vec::new();
        let mut read_dir = fs::read_dir(path).await?;

        while let Some(entry) = read_dir.next_entry().await? {
            entries.push(entry.path());
        }

        Ok(entries)
    }
}
