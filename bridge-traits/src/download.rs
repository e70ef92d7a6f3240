//! Media download abstraction.
//!
//! The download cache asks the host to materialize a remote media locator
//! into a private directory. Hosts own the transfer (HTTP client, background
//! session, OS download manager) and report progress through a callback.
//!
//! Transfers are resumable: a request carries the number of bytes already
//! present in the partial file, and implementations that support ranged
//! requests continue from there instead of starting over.

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;

use crate::error::Result;

/// Describes one transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    /// Remote media locator.
    pub url: String,
    /// Final location of the materialized file.
    pub destination: PathBuf,
    /// Bytes already present in [`DownloadRequest::partial_path`].
    pub resume_from: u64,
}

impl DownloadRequest {
    pub fn new(url: impl Into<String>, destination: impl Into<PathBuf>) -> Self {
        Self {
            url: url.into(),
            destination: destination.into(),
            resume_from: 0,
        }
    }

    pub fn resume_from(mut self, bytes: u64) -> Self {
        self.resume_from = bytes;
        self
    }

    /// Path of the in-progress file, renamed to `destination` on completion.
    pub fn partial_path(&self) -> PathBuf {
        let mut name = self
            .destination
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".part");
        self.destination.with_file_name(name)
    }
}

/// Progress reported while a transfer runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferProgress {
    /// Total bytes written so far, including resumed bytes.
    pub bytes_written: u64,
    /// Expected total size, when the server announced one.
    pub total_bytes: Option<u64>,
}

/// Callback invoked for every progress update.
pub type ProgressCallback = Arc<dyn Fn(TransferProgress) + Send + Sync>;

/// Result of a completed transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedFile {
    pub path: PathBuf,
    pub bytes_written: u64,
}

/// Host-provided media downloader.
///
/// Implementations must either leave a complete file at
/// `request.destination` and return `Ok`, or return an error without
/// creating `destination`. The partial file may be kept for resumption.
#[async_trait]
pub trait MediaDownloader: Send + Sync {
    async fn download(
        &self,
        request: DownloadRequest,
        progress: ProgressCallback,
    ) -> Result<DownloadedFile>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_path_appends_suffix() {
        let request = DownloadRequest::new("https://cdn.example.com/a.mp3", "/data/music/abc.mp3");
        assert_eq!(request.partial_path(), PathBuf::from("/data/music/abc.mp3.part"));
        assert_eq!(request.resume_from, 0);
    }

    #[test]
    fn resume_offset_is_recorded() {
        let request = DownloadRequest::new("u", "/tmp/x.mp3").resume_from(512);
        assert_eq!(request.resume_from, 512);
    }
}
