//! Media downloader built on `reqwest`.

use async_trait::async_trait;
use bridge_traits::{
    download::{DownloadRequest, DownloadedFile, MediaDownloader, ProgressCallback, TransferProgress},
    error::{BridgeError, Result},
};
use futures_util::StreamExt;
use reqwest::{header, Client, StatusCode};
use std::time::Duration;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

/// Streams media into `<destination>.part` and renames it on completion.
///
/// Resumes with an HTTP `Range` request when the caller reports existing
/// partial bytes. Servers that ignore the range (plain `200 OK`) restart the
/// transfer from zero.
pub struct ReqwestMediaDownloader {
    client: Client,
}

impl ReqwestMediaDownloader {
    pub fn new() -> Self {
        Self::with_connect_timeout(Duration::from_secs(10))
    }

    pub fn with_connect_timeout(timeout: Duration) -> Self {
        let client = Client::builder()
            .connect_timeout(timeout)
            .user_agent(concat!("pocket-player/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "Falling back to default HTTP client");
                Client::new()
            });

        Self { client }
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    fn map_reqwest_error(e: reqwest::Error) -> BridgeError {
        if e.is_timeout() {
            BridgeError::Network("request timed out".to_string())
        } else if e.is_connect() {
            BridgeError::Network(format!("connection failed: {}", e))
        } else {
            BridgeError::Network(e.to_string())
        }
    }
}

impl Default for ReqwestMediaDownloader {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MediaDownloader for ReqwestMediaDownloader {
    async fn download(
        &self,
        request: DownloadRequest,
        progress: ProgressCallback,
    ) -> Result<DownloadedFile> {
        let partial = request.partial_path();
        if let Some(parent) = request.destination.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut builder = self.client.get(&request.url);
        if request.resume_from > 0 {
            builder = builder.header(header::RANGE, format!("bytes={}-", request.resume_from));
        }

        let response = builder.send().await.map_err(Self::map_reqwest_error)?;
        let status = response.status();

        if status == StatusCode::RANGE_NOT_SATISFIABLE && request.resume_from > 0 {
            // The partial file already holds the whole body.
            fs::rename(&partial, &request.destination).await?;
            return Ok(DownloadedFile {
                path: request.destination,
                bytes_written: request.resume_from,
            });
        }

        if !status.is_success() {
            return Err(BridgeError::Network(format!("HTTP {} for media download", status)));
        }

        let resumed = status == StatusCode::PARTIAL_CONTENT;
        let offset = if resumed { request.resume_from } else { 0 };
        let total_bytes = response.content_length().map(|len| len + offset);

        debug!(
            resumed,
            offset,
            total_bytes = ?total_bytes,
            "Streaming media body"
        );

        let mut file = fs::OpenOptions::new()
            .create(true)
            .write(true)
            .append(resumed)
            .truncate(!resumed)
            .open(&partial)
            .await?;

        let mut written = offset;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(Self::map_reqwest_error)?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
            progress(TransferProgress {
                bytes_written: written,
                total_bytes,
            });
        }

        file.flush().await?;
        drop(file);

        if let Some(expected) = total_bytes {
            if written < expected {
                return Err(BridgeError::Network(format!(
                    "body ended early: {} of {} bytes",
                    written, expected
                )));
            }
        }

        fs::rename(&partial, &request.destination).await?;

        Ok(DownloadedFile {
            path: request.destination,
            bytes_written: written,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_downloader_creation() {
        let _downloader = ReqwestMediaDownloader::new();
    }

    #[tokio::test]
    async fn test_unreachable_host_is_network_error() {
        let downloader = ReqwestMediaDownloader::with_connect_timeout(Duration::from_millis(200));
        let destination = std::env::temp_dir()
            .join(format!("pocket-player-dl-{}", std::process::id()))
            .join("x.mp3");
        let request = DownloadRequest::new("http://127.0.0.1:9/none.mp3", &destination);

        let result = downloader.download(request, Arc::new(|_| {})).await;

        assert!(matches!(result, Err(BridgeError::Network(_))));
        assert!(!destination.exists());
    }
}
