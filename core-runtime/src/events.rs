//! # Event Bus System
//!
//! Typed domain events broadcast to any number of subscribers over
//! `tokio::sync::broadcast`.
//!
//! ## Overview
//!
//! ```text
//! ┌──────────────────┐   emit   ┌───────────┐  subscribe  ┌──────────────┐
//! │ SessionController├─────────>│           ├────────────>│ Now-playing  │
//! └──────────────────┘          │ EventBus  │             │ UI           │
//! ┌──────────────────┐   emit   │           │  subscribe  ┌──────────────┐
//! │ DownloadCache    ├─────────>│           ├────────────>│ Download     │
//! └──────────────────┘          └───────────┘             │ badge        │
//!                                                         └──────────────┘
//! ```
//!
//! Events are lossy by nature: a subscriber that falls more than `capacity`
//! events behind receives `RecvError::Lagged(n)` and continues from the
//! oldest retained event. `RecvError::Closed` means every sender is gone.
//! Authoritative state lives in the session snapshot, not in the event log.
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, EventBus, EventStream, PlaybackEvent};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let bus = EventBus::new(64);
//! let mut stream = EventStream::new(bus.subscribe())
//!     .filter(|event| matches!(event, CoreEvent::Playback(_)));
//!
//! bus.emit(CoreEvent::Playback(PlaybackEvent::Completed {
//!     track_id: "t-1".to_string(),
//! }))
//! .ok();
//!
//! let event = stream.recv().await.unwrap();
//! assert_eq!(event.description(), "Track completed");
//! # }
//! ```

use core_async::sync::broadcast;
use serde::{Deserialize, Serialize};
use std::fmt;

pub use core_async::sync::broadcast::error::{RecvError, SendError};
pub use core_async::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
///
/// Position updates arrive several times per second, so this leaves a few
/// seconds of slack for slow subscribers.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event published on the bus.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    Playback(PlaybackEvent),
    Download(DownloadEvent),
}

impl CoreEvent {
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Playback(e) => e.description(),
            CoreEvent::Download(e) => e.description(),
        }
    }

    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Playback(PlaybackEvent::Error { .. }) => EventSeverity::Error,
            CoreEvent::Download(DownloadEvent::Failed { .. }) => EventSeverity::Warning,
            CoreEvent::Playback(PlaybackEvent::Started { .. })
            | CoreEvent::Playback(PlaybackEvent::Completed { .. })
            | CoreEvent::Download(DownloadEvent::Completed { .. }) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }

    /// Track the event refers to, when it names one.
    pub fn track_id(&self) -> Option<&str> {
        match self {
            CoreEvent::Playback(e) => e.track_id(),
            CoreEvent::Download(e) => Some(e.track_id()),
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

// ============================================================================
// Playback Events
// ============================================================================

/// Which stage of playback failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlaybackFailure {
    /// The backend could not create or prepare the media resource.
    LoadFailed,
    /// The resource was loaded but playback itself failed.
    PlaybackFailed,
}

/// Events emitted by the session controller.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum PlaybackEvent {
    /// A track was requested and its backend resource is being prepared.
    Loading { track_id: String },
    /// The backend confirmed playback of a freshly loaded track.
    Started {
        track_id: String,
        title: String,
        /// Backend kind serving the session (`streaming_element` or `native_engine`).
        backend: String,
    },
    Paused { track_id: String, position_ms: u64 },
    Resumed { track_id: String, position_ms: u64 },
    /// The session was torn down before the track ended.
    Stopped { track_id: String },
    /// Track finished playing naturally.
    Completed { track_id: String },
    /// Position or duration reported by the backend changed.
    PositionChanged {
        track_id: String,
        position_ms: u64,
        /// `0` while unknown.
        duration_ms: u64,
    },
    BufferingChanged { track_id: String, is_buffering: bool },
    /// Terminal failure. The session is already idle when this is emitted.
    Error {
        track_id: Option<String>,
        kind: PlaybackFailure,
        message: String,
    },
}

impl PlaybackEvent {
    fn description(&self) -> &str {
        match self {
            PlaybackEvent::Loading { .. } => "Loading track",
            PlaybackEvent::Started { .. } => "Playback started",
            PlaybackEvent::Paused { .. } => "Playback paused",
            PlaybackEvent::Resumed { .. } => "Playback resumed",
            PlaybackEvent::Stopped { .. } => "Playback stopped",
            PlaybackEvent::Completed { .. } => "Track completed",
            PlaybackEvent::PositionChanged { .. } => "Playback position changed",
            PlaybackEvent::BufferingChanged { .. } => "Buffering state changed",
            PlaybackEvent::Error { .. } => "Playback error",
        }
    }

    pub fn track_id(&self) -> Option<&str> {
        match self {
            PlaybackEvent::Loading { track_id }
            | PlaybackEvent::Started { track_id, .. }
            | PlaybackEvent::Paused { track_id, .. }
            | PlaybackEvent::Resumed { track_id, .. }
            | PlaybackEvent::Stopped { track_id }
            | PlaybackEvent::Completed { track_id }
            | PlaybackEvent::PositionChanged { track_id, .. }
            | PlaybackEvent::BufferingChanged { track_id, .. } => Some(track_id),
            PlaybackEvent::Error { track_id, .. } => track_id.as_deref(),
        }
    }
}

// ============================================================================
// Download Events
// ============================================================================

/// Events emitted by the download cache.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum DownloadEvent {
    Started {
        track_id: String,
        /// Bytes already on disk from an earlier interrupted attempt.
        resumed_from: u64,
    },
    Progress {
        track_id: String,
        downloaded_bytes: u64,
        total_bytes: Option<u64>,
    },
    Completed { track_id: String, bytes: u64 },
    Failed {
        track_id: String,
        message: String,
        attempts: u32,
    },
}

impl DownloadEvent {
    fn description(&self) -> &str {
        match self {
            DownloadEvent::Started { .. } => "Download started",
            DownloadEvent::Progress { .. } => "Download progress",
            DownloadEvent::Completed { .. } => "Download completed",
            DownloadEvent::Failed { .. } => "Download failed",
        }
    }

    pub fn track_id(&self) -> &str {
        match self {
            DownloadEvent::Started { track_id, .. }
            | DownloadEvent::Progress { track_id, .. }
            | DownloadEvent::Completed { track_id, .. }
            | DownloadEvent::Failed { track_id, .. } => track_id,
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central event bus. Cloning yields another producer on the same channel.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Create a bus retaining up to `capacity` events per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish to all current subscribers.
    ///
    /// Returns the number of receivers, or an error when nobody is
    /// subscribed. Producers normally ignore that error.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// New receiver for all future events. Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// A `broadcast::Receiver` with an optional predicate.
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Only events matching `predicate` are returned by `recv`.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    fn accepts(&self, event: &CoreEvent) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(event))
    }

    /// Next matching event.
    ///
    /// # Errors
    ///
    /// `RecvError::Lagged(n)` if this subscriber fell `n` events behind,
    /// `RecvError::Closed` once every sender is dropped.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.accepts(&event) {
                return Ok(event);
            }
        }
    }

    /// Next matching event without waiting. `None` when nothing is queued.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.accepts(&event) {
                        return Some(Ok(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
