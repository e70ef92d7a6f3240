//! Download progress and cache statistics

use serde::{Deserialize, Serialize};

/// Snapshot of the download cache.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheStats {
    /// Tracks with a recorded URI
    pub resolved_tracks: usize,

    /// Fetches currently in flight
    pub active_downloads: usize,

    /// Bytes in the media directory, including partial files
    pub disk_usage_bytes: u64,

    /// Unix timestamp (seconds) when stats were calculated
    pub calculated_at: i64,
}

/// Download progress information for a specific track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloadProgress {
    pub track_id: String,

    /// Expected size, once the server announced it
    pub total_bytes: Option<u64>,

    /// Bytes on disk so far, including resumed bytes
    pub downloaded_bytes: u64,

    /// `None` while the total is unknown
    pub progress_percent: Option<u8>,

    /// Bytes/second since this attempt started
    pub speed_bytes_per_sec: u64,

    /// 1-based attempt number
    pub attempt: u32,

    /// Unix timestamp in milliseconds
    pub started_at: i64,

    /// Unix timestamp in milliseconds
    pub updated_at: i64,

    resumed_from: u64,
}

impl DownloadProgress {
    pub fn new(track_id: impl Into<String>) -> Self {
        let now = chrono::Utc::now().timestamp_millis();

        Self {
            track_id: track_id.into(),
            total_bytes: None,
            downloaded_bytes: 0,
            progress_percent: None,
            speed_bytes_per_sec: 0,
            attempt: 1,
            started_at: now,
            updated_at: now,
            resumed_from: 0,
        }
    }

    /// Reset timing for a new attempt starting at `resumed_from` bytes.
    pub fn begin_attempt(&mut self, attempt: u32, resumed_from: u64) {
        let now = chrono::Utc::now().timestamp_millis();
        self.attempt = attempt;
        self.resumed_from = resumed_from;
        self.downloaded_bytes = resumed_from;
        self.started_at = now;
        self.updated_at = now;
        self.speed_bytes_per_sec = 0;
    }

    /// Record new totals. Returns `true` when the whole percentage changed,
    /// or on every update while the total is unknown.
    pub fn update(&mut self, downloaded_bytes: u64, total_bytes: Option<u64>) -> bool {
        let now = chrono::Utc::now().timestamp_millis();
        let elapsed_ms = (now - self.started_at).max(1) as u64;

        self.downloaded_bytes = downloaded_bytes;
        self.total_bytes = total_bytes.or(self.total_bytes);
        self.updated_at = now;

        let transferred = downloaded_bytes.saturating_sub(self.resumed_from);
        self.speed_bytes_per_sec = transferred.saturating_mul(1000) / elapsed_ms;

        let previous = self.progress_percent;
        self.progress_percent = match self.total_bytes {
            Some(total) if total > 0 => {
                let percent = (downloaded_bytes as f64 / total as f64) * 100.0;
                Some(percent.min(100.0) as u8)
            }
            _ => None,
        };

        self.progress_percent.is_none() || self.progress_percent != previous
    }

    pub fn is_complete(&self) -> bool {
        matches!(self.total_bytes, Some(total) if self.downloaded_bytes >= total)
    }

    /// Seconds remaining at the current speed.
    pub fn eta_seconds(&self) -> Option<u64> {
        let total = self.total_bytes?;
        if self.speed_bytes_per_sec == 0 {
            return None;
        }
        Some(total.saturating_sub(self.downloaded_bytes) / self.speed_bytes_per_sec)
    }

    /// Format speed as human-readable string.
    pub fn speed_string(&self) -> String {
        format_bytes_per_sec(self.speed_bytes_per_sec)
    }
}

fn format_bytes_per_sec(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B/s", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB/s", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB/s", bytes as f64 / (1024.0 * 1024.0))
    }
}
