//! Playback session aggregate.

use crate::backend::{HandleId, StatusUpdate};
use crate::track::Track;
use serde::{Deserialize, Serialize};

/// Lifecycle state of the session.
///
/// Buffering is a flag on top of `Playing`/`Paused`. A finished or failed
/// track collapses straight back to `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    #[default]
    Idle,
    Loading,
    Playing,
    Paused,
}

/// Snapshot of the single active (or empty) playback session.
///
/// `track` and `handle` are always both set or both empty. While a track is
/// loading neither is set yet.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PlaybackSession {
    pub track: Option<Track>,
    pub handle: Option<HandleId>,
    pub is_playing: bool,
    pub is_buffering: bool,
    pub position_ms: u64,
    /// `0` while unknown.
    pub duration_ms: u64,
    pub state: SessionState,
}

/// What a status update changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct SessionDelta {
    pub position_changed: bool,
    pub buffering_changed: bool,
}

impl PlaybackSession {
    pub fn empty() -> Self {
        Self::default()
    }

    pub(crate) fn loading() -> Self {
        Self {
            state: SessionState::Loading,
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::empty()
    }

    pub fn has_track(&self) -> bool {
        self.track.is_some()
    }

    pub fn track_id(&self) -> Option<&str> {
        self.track.as_ref().map(|t| t.id().as_str())
    }

    /// `handle ⇔ track`, and the position stays inside a known duration.
    pub fn is_consistent(&self) -> bool {
        self.handle.is_some() == self.track.is_some()
            && (self.duration_ms == 0 || self.position_ms <= self.duration_ms)
    }

    pub(crate) fn attach(&mut self, track: Track, handle: HandleId) {
        self.track = Some(track);
        self.handle = Some(handle);
    }

    /// Merge a backend status update.
    ///
    /// Playing/paused flips are ignored while loading; the controller
    /// decides when a load has turned into playback.
    pub(crate) fn apply(&mut self, update: &StatusUpdate) -> SessionDelta {
        let before = (self.position_ms, self.duration_ms, self.is_buffering);

        if let Some(duration) = update.duration_ms.filter(|d| *d > 0) {
            self.duration_ms = duration;
        }
        if let Some(position) = update.position_ms {
            self.position_ms = position;
        }
        if self.duration_ms > 0 {
            self.position_ms = self.position_ms.min(self.duration_ms);
        }

        if let Some(buffering) = update.is_buffering {
            self.is_buffering = buffering;
        }

        if let Some(playing) = update.is_playing {
            if matches!(self.state, SessionState::Playing | SessionState::Paused) {
                self.is_playing = playing;
                self.state = if playing {
                    SessionState::Playing
                } else {
                    SessionState::Paused
                };
            }
        }

        SessionDelta {
            position_changed: (self.position_ms, self.duration_ms) != (before.0, before.1),
            buffering_changed: self.is_buffering != before.2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attached(state: SessionState) -> PlaybackSession {
        let mut session = PlaybackSession {
            state,
            ..PlaybackSession::default()
        };
        session.attach(Track::new("t1", "Song", "Artist", "https://x/t1.mp3"), HandleId::new());
        session
    }

    #[test]
    fn test_empty_session() {
        let session = PlaybackSession::empty();
        assert!(session.is_empty());
        assert!(session.is_consistent());
        assert_eq!(session.state, SessionState::Idle);
        assert!(!PlaybackSession::loading().is_empty());
    }

    #[test]
    fn test_position_is_clamped_to_known_duration() {
        let mut session = attached(SessionState::Playing);

        let delta = session.apply(&StatusUpdate::position(200_000, Some(180_000)));
        assert!(delta.position_changed);
        assert_eq!(session.position_ms, 180_000);
        assert!(session.is_consistent());

        // Unknown duration leaves the position unclamped.
        let mut session = attached(SessionState::Playing);
        session.apply(&StatusUpdate::position(5_000, None));
        assert_eq!(session.position_ms, 5_000);
        assert_eq!(session.duration_ms, 0);
    }

    #[test]
    fn test_playing_flag_follows_backend_after_load() {
        let mut session = attached(SessionState::Playing);
        session.apply(&StatusUpdate::playing(false));
        assert_eq!(session.state, SessionState::Paused);
        assert!(!session.is_playing);

        let mut loading = attached(SessionState::Loading);
        loading.apply(&StatusUpdate::playing(true));
        assert_eq!(loading.state, SessionState::Loading);
        assert!(!loading.is_playing);
    }

    #[test]
    fn test_buffering_delta() {
        let mut session = attached(SessionState::Playing);
        assert!(session.apply(&StatusUpdate::buffering(true)).buffering_changed);
        assert!(!session.apply(&StatusUpdate::buffering(true)).buffering_changed);
        assert_eq!(session.state, SessionState::Playing);
    }
}
