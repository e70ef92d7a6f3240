//! # Playback Error Types
//!
//! Errors surfaced by the download cache, the backend adapters and the
//! session controller.

use bridge_traits::BridgeError;
use thiserror::Error;

/// Errors that can occur during playback operations.
#[derive(Error, Debug)]
pub enum PlaybackError {
    // ========================================================================
    // Track Errors
    // ========================================================================
    /// The track reference is unusable (empty id or media locator).
    #[error("Invalid track reference: {0}")]
    InvalidTrack(String),

    // ========================================================================
    // Backend Errors
    // ========================================================================
    /// The backend could not create or prepare the media resource.
    #[error("Failed to load media: {0}")]
    LoadFailed(String),

    /// The resource is loaded but the backend refused or aborted playback.
    #[error("Playback failed: {0}")]
    PlaybackFailed(String),

    /// Resuming a paused session failed.
    #[error("Resume failed: {0}")]
    ResumeFailed(String),

    /// Attempted operation when no track is loaded.
    #[error("No track loaded")]
    NoTrackLoaded,

    /// A host primitive reported an error outside load and play.
    #[error("Backend error: {0}")]
    Backend(#[from] BridgeError),

    // ========================================================================
    // Cache Errors
    // ========================================================================
    /// Every download attempt for the track failed.
    #[error("Download failed for track {track_id}: {reason}")]
    DownloadFailed { track_id: String, reason: String },

    /// Download cache misconfiguration or bookkeeping failure.
    #[error("Cache error: {0}")]
    CacheError(String),

    // ========================================================================
    // Generic Errors
    // ========================================================================
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error (should not occur in normal operation).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PlaybackError {
    /// Returns `true` if this error is transient and the operation can be retried.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            PlaybackError::DownloadFailed { .. } | PlaybackError::ResumeFailed(_)
        ) || self.is_network_error()
    }

    /// Returns `true` if this error is due to network issues.
    pub fn is_network_error(&self) -> bool {
        matches!(
            self,
            PlaybackError::DownloadFailed { .. } | PlaybackError::Backend(BridgeError::Network(_))
        )
    }

    /// Returns `true` for failures that end the session.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PlaybackError::LoadFailed(_) | PlaybackError::PlaybackFailed(_)
        )
    }
}

/// Result type for playback operations.
pub type Result<T> = std::result::Result<T, PlaybackError>;
