//! # Download Cache
//!
//! Maps track ids to locally playable URIs.
//!
//! - `LocalFiles` storage downloads media into `<data dir>/<media_directory>/`
//!   and resolves to a `file://` URI.
//! - `RemoteOnly` storage records the remote locator as-is.
//! - Concurrent `resolve` calls for the same id share one fetch.
//! - Entries are never evicted within the lifetime of the cache.

use crate::cache::{
    config::{CacheConfig, CacheStorage},
    stats::{CacheStats, DownloadProgress},
};
use crate::error::{PlaybackError, Result};
use crate::track::{Track, TrackId};
use bridge_traits::{
    download::{DownloadRequest, MediaDownloader, ProgressCallback, TransferProgress},
    storage::FileSystemAccess,
};
use core_async::future::{BoxFuture, FutureExt, Shared};
use core_async::time::timeout;
use core_runtime::events::{CoreEvent, DownloadEvent, EventBus};
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

const DEFAULT_EXTENSION: &str = "mp3";
const BASE_BACKOFF_MS: u64 = 100;
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Failure shared between every caller joined on the same fetch.
#[derive(Debug, Clone)]
struct FetchFailure {
    reason: String,
}

type SharedFetch = Shared<BoxFuture<'static, std::result::Result<String, FetchFailure>>>;

#[derive(Default)]
struct CacheState {
    resolved: HashMap<TrackId, String>,
    in_flight: HashMap<TrackId, SharedFetch>,
    progress: HashMap<TrackId, DownloadProgress>,
}

/// Shared download cache. Clones refer to the same records.
#[derive(Clone)]
pub struct DownloadCache {
    config: Arc<CacheConfig>,
    fs: Option<Arc<dyn FileSystemAccess>>,
    downloader: Option<Arc<dyn MediaDownloader>>,
    event_bus: Option<EventBus>,
    state: Arc<Mutex<CacheState>>,
}

impl DownloadCache {
    /// Create a cache.
    ///
    /// `LocalFiles` storage requires both a filesystem and a downloader;
    /// `RemoteOnly` storage ignores them.
    pub fn new(
        config: CacheConfig,
        fs: Option<Arc<dyn FileSystemAccess>>,
        downloader: Option<Arc<dyn MediaDownloader>>,
    ) -> Result<Self> {
        config.validate().map_err(|e| {
            PlaybackError::CacheError(format!("Invalid cache configuration: {}", e))
        })?;

        if config.storage == CacheStorage::LocalFiles {
            if fs.is_none() {
                return Err(PlaybackError::CacheError(
                    "local file storage requires a FileSystemAccess implementation".to_string(),
                ));
            }
            if downloader.is_none() {
                return Err(PlaybackError::CacheError(
                    "local file storage requires a MediaDownloader implementation".to_string(),
                ));
            }
        }

        Ok(Self {
            config: Arc::new(config),
            fs,
            downloader,
            event_bus: None,
            state: Arc::new(Mutex::new(CacheState::default())),
        })
    }

    /// Cache for hosts without private storage.
    pub fn remote_only() -> Self {
        Self {
            config: Arc::new(CacheConfig::remote_only()),
            fs: None,
            downloader: None,
            event_bus: None,
            state: Arc::new(Mutex::new(CacheState::default())),
        }
    }

    /// Set event bus for download events.
    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn storage(&self) -> CacheStorage {
        self.config.storage
    }

    /// Resolve a track to a playable URI, downloading it if needed.
    ///
    /// Joins an in-flight fetch for the same id instead of starting a second
    /// transfer. On failure nothing is recorded and every joined caller
    /// receives `DownloadFailed`.
    #[instrument(skip(self, track), fields(track_id = %track.id()))]
    pub async fn resolve(&self, track: &Track) -> Result<String> {
        track.validate()?;
        let track_id = track.id().clone();

        let fetch = {
            let mut state = self.state.lock();

            if let Some(uri) = state.resolved.get(&track_id) {
                debug!("Track already resolved");
                return Ok(uri.clone());
            }

            if self.config.storage == CacheStorage::RemoteOnly {
                let uri = track.media_locator().to_string();
                state.resolved.insert(track_id, uri.clone());
                debug!("Recorded remote locator");
                return Ok(uri);
            }

            match state.in_flight.get(&track_id) {
                Some(fetch) => {
                    debug!("Joining in-flight download");
                    fetch.clone()
                }
                None => {
                    let fetch = self.start_fetch(track.clone());
                    state.in_flight.insert(track_id.clone(), fetch.clone());
                    state
                        .progress
                        .insert(track_id.clone(), DownloadProgress::new(track_id.as_str()));
                    fetch
                }
            }
        };

        fetch
            .await
            .map_err(|failure| PlaybackError::DownloadFailed {
                track_id: track_id.to_string(),
                reason: failure.reason,
            })
    }

    /// Whether a URI has been recorded for the track.
    pub fn is_resolved(&self, track_id: &TrackId) -> bool {
        self.state.lock().resolved.contains_key(track_id)
    }

    pub fn resolved_uri(&self, track_id: &TrackId) -> Option<String> {
        self.state.lock().resolved.get(track_id).cloned()
    }

    /// Progress of an in-flight fetch.
    pub fn download_progress(&self, track_id: &TrackId) -> Option<DownloadProgress> {
        self.state.lock().progress.get(track_id).cloned()
    }

    pub fn active_downloads(&self) -> Vec<DownloadProgress> {
        self.state.lock().progress.values().cloned().collect()
    }

    /// Current cache statistics.
    pub async fn stats(&self) -> Result<CacheStats> {
        let (resolved_tracks, active_downloads) = {
            let state = self.state.lock();
            (state.resolved.len(), state.in_flight.len())
        };

        let disk_usage_bytes = match (&self.fs, self.config.storage) {
            (Some(fs), CacheStorage::LocalFiles) => {
                let dir = self.media_directory(fs.as_ref()).await?;
                if fs.exists(&dir).await? {
                    fs.directory_size(&dir).await?
                } else {
                    0
                }
            }
            _ => 0,
        };

        Ok(CacheStats {
            resolved_tracks,
            active_downloads,
            disk_usage_bytes,
            calculated_at: chrono::Utc::now().timestamp(),
        })
    }

    fn start_fetch(&self, track: Track) -> SharedFetch {
        let cache = self.clone();
        let task = core_async::spawn(async move { cache.run_fetch(track).await });

        async move {
            match task.await {
                Ok(result) => result,
                Err(e) => Err(FetchFailure {
                    reason: format!("download task aborted: {}", e),
                }),
            }
        }
        .boxed()
        .shared()
    }

    async fn run_fetch(&self, track: Track) -> std::result::Result<String, FetchFailure> {
        let track_id = track.id().clone();
        let result = self.download_with_retry(&track).await;

        let mut state = self.state.lock();
        state.in_flight.remove(&track_id);
        state.progress.remove(&track_id);

        match result {
            Ok((path, bytes)) => {
                let uri = file_uri(&path);
                state.resolved.insert(track_id.clone(), uri.clone());
                drop(state);

                info!(track_id = %track_id, bytes, "Download completed");
                self.emit(DownloadEvent::Completed {
                    track_id: track_id.to_string(),
                    bytes,
                });
                Ok(uri)
            }
            Err((reason, attempts)) => {
                drop(state);

                error!(track_id = %track_id, attempts, "Download failed: {}", reason);
                self.emit(DownloadEvent::Failed {
                    track_id: track_id.to_string(),
                    message: reason.clone(),
                    attempts,
                });
                Err(FetchFailure { reason })
            }
        }
    }

    /// Download with automatic retry logic.
    ///
    /// Returns the final path and its size, or the last error and the number
    /// of attempts made.
    async fn download_with_retry(
        &self,
        track: &Track,
    ) -> std::result::Result<(PathBuf, u64), (String, u32)> {
        let (fs, downloader) = match (&self.fs, &self.downloader) {
            (Some(fs), Some(downloader)) => (fs.clone(), downloader.clone()),
            _ => return Err(("local storage is not configured".to_string(), 0)),
        };

        let dir = self
            .media_directory(fs.as_ref())
            .await
            .map_err(|e| (e.to_string(), 0))?;
        fs.create_dir_all(&dir)
            .await
            .map_err(|e| (format!("failed to create media directory: {}", e), 0))?;

        let destination = dir.join(media_file_name(track));
        if fs.exists(&destination).await.unwrap_or(false) {
            let size = fs
                .metadata(&destination)
                .await
                .map(|m| m.size)
                .unwrap_or_default();
            debug!(
                file = %destination.display(),
                "Reusing media file from an earlier session"
            );
            return Ok((destination, size));
        }

        let max_attempts = self.config.max_retry_attempts;
        let mut last_error = String::from("download failed after all retries");

        for attempt in 1..=max_attempts {
            let mut request = DownloadRequest::new(track.media_locator(), destination.clone());
            let resume_from = partial_length(fs.as_ref(), &request.partial_path()).await;
            request = request.resume_from(resume_from);

            debug!(
                "Download attempt {}/{} for track {} (resuming at {} bytes)",
                attempt,
                max_attempts,
                track.id(),
                resume_from
            );

            if let Some(progress) = self.state.lock().progress.get_mut(track.id()) {
                progress.begin_attempt(attempt, resume_from);
            }
            if attempt == 1 {
                self.emit(DownloadEvent::Started {
                    track_id: track.id().to_string(),
                    resumed_from: resume_from,
                });
            }

            let callback = self.progress_callback(track.id().clone());
            match timeout(
                self.config.download_timeout,
                downloader.download(request, callback),
            )
            .await
            {
                Ok(Ok(file)) => return Ok((file.path, file.bytes_written)),
                Ok(Err(e)) => {
                    warn!("Download attempt {} failed: {}", attempt, e);
                    last_error = e.to_string();
                }
                Err(_) => {
                    warn!("Download attempt {} timed out", attempt);
                    last_error = "download timed out".to_string();
                }
            }

            // Exponential backoff
            if attempt < max_attempts {
                let delay = backoff_delay(attempt);
                core_async::time::sleep(delay).await;
            }
        }

        Err((last_error, max_attempts))
    }

    fn progress_callback(&self, track_id: TrackId) -> ProgressCallback {
        let cache = self.clone();

        Arc::new(move |transfer: TransferProgress| {
            let changed = match cache.state.lock().progress.get_mut(&track_id) {
                Some(progress) => progress.update(transfer.bytes_written, transfer.total_bytes),
                None => false,
            };

            if changed {
                cache.emit(DownloadEvent::Progress {
                    track_id: track_id.to_string(),
                    downloaded_bytes: transfer.bytes_written,
                    total_bytes: transfer.total_bytes,
                });
            }
        })
    }

    async fn media_directory(&self, fs: &dyn FileSystemAccess) -> Result<PathBuf> {
        let data_dir = fs.get_data_directory().await.map_err(|e| {
            PlaybackError::CacheError(format!("Failed to get data directory: {}", e))
        })?;
        Ok(data_dir.join(&self.config.media_directory))
    }

    fn emit(&self, event: DownloadEvent) {
        if let Some(bus) = &self.event_bus {
            // No subscribers is fine.
            let _ = bus.emit(CoreEvent::Download(event));
        }
    }
}

async fn partial_length(fs: &dyn FileSystemAccess, partial: &Path) -> u64 {
    match fs.exists(partial).await {
        Ok(true) => fs.metadata(partial).await.map(|m| m.size).unwrap_or(0),
        _ => 0,
    }
}

/// `<first 16 hex chars of sha256(id)>.<extension>`
/// Delay before the attempt after `attempt`: 100ms doubling, capped at 30s.
fn backoff_delay(attempt: u32) -> Duration {
    let factor = 2u64.checked_pow(attempt.saturating_sub(1)).unwrap_or(u64::MAX);
    Duration::from_millis(BASE_BACKOFF_MS.saturating_mul(factor)).min(MAX_BACKOFF)
}

fn media_file_name(track: &Track) -> String {
    let digest = Sha256::digest(track.id().as_str().as_bytes());
    let hash = hex::encode(digest);
    format!("{}.{}", &hash[..16], locator_extension(track.media_locator()))
}

fn locator_extension(locator: &str) -> String {
    let path = locator
        .split(|c| c == '?' || c == '#')
        .next()
        .unwrap_or(locator);
    let last_segment = path.rsplit('/').next().unwrap_or(path);

    match last_segment.rsplit_once('.') {
        Some((stem, ext))
            if !stem.is_empty()
                && (1..=5).contains(&ext.len())
                && ext.chars().all(|c| c.is_ascii_alphanumeric()) =>
        {
            ext.to_ascii_lowercase()
        }
        _ => DEFAULT_EXTENSION.to_string(),
    }
}

fn file_uri(path: &Path) -> String {
    format!("file://{}", path.display())
}
