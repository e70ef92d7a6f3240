//! # Playback Backend Adapter
//!
//! One capability set over two structurally different platform primitives.
//!
//! ## Variants
//!
//! - **StreamingElement**: a browser-style media element. Plays the remote
//!   locator directly unless the download cache already holds the track.
//! - **NativeEngine**: a native sound engine that only plays local files.
//!   Every track is downloaded through the cache before it is loaded.
//!
//! The variant is chosen once, when the player is assembled, and never
//! changes for the lifetime of a [`crate::session::SessionController`].
//!
//! ## Handle Lifecycle
//!
//! ```text
//! load() ──> BackendHandle ──> play/pause/seek ──> unload()
//!               │                                     │
//!               └── status listener ── StatusSink     └── listener detached once,
//!                                                         resource released once
//! ```
//!
//! A handle only exists as the result of a successful `load`. `unload` is
//! safe on any handle, any number of times.

pub mod native;
pub mod streaming;

pub use native::NativeEngineBackend;
pub use streaming::StreamingElementBackend;

use crate::error::Result;
use crate::track::Track;
use bridge_traits::{ElementId, ListenerToken, SoundId};
use core_async::sync::mpsc;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use uuid::Uuid;

// ============================================================================
// Identity
// ============================================================================

/// Which platform primitive drives playback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    StreamingElement,
    NativeEngine,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::StreamingElement => "streaming_element",
            BackendKind::NativeEngine => "native_engine",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unique identity of one loaded handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HandleId(Uuid);

impl HandleId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for HandleId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Status Stream
// ============================================================================

/// Backend status translated into one shape for both variants.
///
/// `None` means the primitive did not report that field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusUpdate {
    pub position_ms: Option<u64>,
    /// `None` while the duration is unknown.
    pub duration_ms: Option<u64>,
    pub is_playing: Option<bool>,
    pub is_buffering: Option<bool>,
    /// The media reached its natural end.
    pub did_finish: bool,
    /// The primitive reported a fatal error.
    pub error: Option<String>,
}

impl StatusUpdate {
    pub fn position(position_ms: u64, duration_ms: Option<u64>) -> Self {
        Self {
            position_ms: Some(position_ms),
            duration_ms,
            ..Self::default()
        }
    }

    pub fn playing(is_playing: bool) -> Self {
        Self {
            is_playing: Some(is_playing),
            ..Self::default()
        }
    }

    pub fn buffering(is_buffering: bool) -> Self {
        Self {
            is_buffering: Some(is_buffering),
            ..Self::default()
        }
    }

    pub fn finished() -> Self {
        Self {
            is_playing: Some(false),
            did_finish: true,
            ..Self::default()
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::default()
        }
    }
}

/// A status update tagged with the handle that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEvent {
    pub handle: HandleId,
    pub update: StatusUpdate,
}

/// Where backends deliver status events.
pub type StatusSink = mpsc::UnboundedSender<StatusEvent>;

pub(crate) fn deliver(sink: &StatusSink, handle: HandleId, update: StatusUpdate) {
    // The controller may already be gone.
    let _ = sink.send(StatusEvent { handle, update });
}

// ============================================================================
// Handle
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Resource {
    Element(ElementId),
    Sound(SoundId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Subscription {
    Element(ListenerToken),
    Sound,
}

#[derive(Debug)]
struct HandleInner {
    id: HandleId,
    kind: BackendKind,
    resource: Resource,
    subscription: Mutex<Option<Subscription>>,
    released: AtomicBool,
}

/// One loaded, playable instance of a track.
///
/// Clones share the same underlying resource and release state.
#[derive(Debug, Clone)]
pub struct BackendHandle {
    inner: Arc<HandleInner>,
}

impl BackendHandle {
    pub(crate) fn new(
        id: HandleId,
        kind: BackendKind,
        resource: Resource,
        subscription: Subscription,
    ) -> Self {
        Self {
            inner: Arc::new(HandleInner {
                id,
                kind,
                resource,
                subscription: Mutex::new(Some(subscription)),
                released: AtomicBool::new(false),
            }),
        }
    }

    pub fn id(&self) -> HandleId {
        self.inner.id
    }

    pub fn kind(&self) -> BackendKind {
        self.inner.kind
    }

    /// Whether `unload` already released the resource.
    pub fn is_released(&self) -> bool {
        self.inner.released.load(Ordering::SeqCst)
    }

    pub(crate) fn resource(&self) -> Resource {
        self.inner.resource
    }

    /// Returns the listener subscription the first time only.
    pub(crate) fn take_subscription(&self) -> Option<Subscription> {
        self.inner.subscription.lock().take()
    }

    /// Returns `true` for the caller that gets to release the resource.
    pub(crate) fn mark_released(&self) -> bool {
        !self.inner.released.swap(true, Ordering::SeqCst)
    }
}

// ============================================================================
// Backend
// ============================================================================

/// The playback backend selected for this player.
pub enum PlaybackBackend {
    StreamingElement(StreamingElementBackend),
    NativeEngine(NativeEngineBackend),
}

impl PlaybackBackend {
    pub fn kind(&self) -> BackendKind {
        match self {
            PlaybackBackend::StreamingElement(_) => BackendKind::StreamingElement,
            PlaybackBackend::NativeEngine(_) => BackendKind::NativeEngine,
        }
    }

    /// Choose the locator to load for `track`.
    pub async fn locate(&self, track: &Track) -> Result<String> {
        match self {
            PlaybackBackend::StreamingElement(backend) => backend.locate(track).await,
            PlaybackBackend::NativeEngine(backend) => backend.locate(track).await,
        }
    }

    /// Create the platform resource and attach its status listener.
    pub async fn load(&self, locator: &str, sink: StatusSink) -> Result<BackendHandle> {
        match self {
            PlaybackBackend::StreamingElement(backend) => backend.load(locator, sink).await,
            PlaybackBackend::NativeEngine(backend) => backend.load(locator, sink).await,
        }
    }

    pub async fn play(&self, handle: &BackendHandle) -> Result<()> {
        match self {
            PlaybackBackend::StreamingElement(backend) => backend.play(handle).await,
            PlaybackBackend::NativeEngine(backend) => backend.play(handle).await,
        }
    }

    pub async fn pause(&self, handle: &BackendHandle) -> Result<()> {
        match self {
            PlaybackBackend::StreamingElement(backend) => backend.pause(handle).await,
            PlaybackBackend::NativeEngine(backend) => backend.pause(handle).await,
        }
    }

    pub async fn seek(&self, handle: &BackendHandle, position_ms: u64) -> Result<()> {
        match self {
            PlaybackBackend::StreamingElement(backend) => backend.seek(handle, position_ms).await,
            PlaybackBackend::NativeEngine(backend) => backend.seek(handle, position_ms).await,
        }
    }

    /// Detach the listener and release the resource.
    ///
    /// Every step is attempted even if an earlier one fails; the first
    /// error is returned. A second call is a no-op.
    pub async fn unload(&self, handle: &BackendHandle) -> Result<()> {
        match self {
            PlaybackBackend::StreamingElement(backend) => backend.unload(handle).await,
            PlaybackBackend::NativeEngine(backend) => backend.unload(handle).await,
        }
    }
}

impl From<StreamingElementBackend> for PlaybackBackend {
    fn from(backend: StreamingElementBackend) -> Self {
        PlaybackBackend::StreamingElement(backend)
    }
}

impl From<NativeEngineBackend> for PlaybackBackend {
    fn from(backend: NativeEngineBackend) -> Self {
        PlaybackBackend::NativeEngine(backend)
    }
}
