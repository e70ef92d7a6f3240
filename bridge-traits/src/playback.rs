//! Playback primitives supplied by the host platform.
//!
//! Two structurally different primitives exist and the core adapts both:
//!
//! - [`MediaElement`]: a browser-style streaming element. It is created from a
//!   source URL, emits discrete DOM-like events (`timeupdate`, `waiting`,
//!   `playing`, `pause`, `ended`, `error`) to registered listeners and reports
//!   time in fractional seconds.
//! - [`NativeAudioEngine`]: a native sound engine that plays local files and
//!   pushes a full status snapshot to a single status listener, with time in
//!   milliseconds.
//!
//! Both primitives identify their resources with opaque ids allocated by the
//! host. Listeners are plain callbacks; they may be invoked from any thread
//! and must not block.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::error::Result;

/// Identifies one media element created by [`MediaElement::create`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementId(pub u64);

/// Identifies one sound created by [`NativeAudioEngine::create_sound`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SoundId(pub u64);

/// Returned by [`MediaElement::add_listener`]; needed to detach the listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerToken(pub u64);

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "element-{}", self.0)
    }
}

impl fmt::Display for SoundId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sound-{}", self.0)
    }
}

// ============================================================================
// Streaming media element
// ============================================================================

/// Events emitted by a streaming media element.
#[derive(Debug, Clone, PartialEq)]
pub enum MediaElementEvent {
    /// Periodic time report. `duration` is `NaN` or infinite while unknown.
    TimeUpdate {
        current_time: f64,
        duration: f64,
        paused: bool,
        ended: bool,
    },
    /// Playback stalled waiting for data.
    Waiting,
    /// Playback started or resumed after buffering.
    Playing,
    Pause,
    Ended,
    Error { message: String },
}

pub type MediaElementListener = Arc<dyn Fn(MediaElementEvent) + Send + Sync>;

/// Browser-style media element primitive.
#[async_trait]
pub trait MediaElement: Send + Sync {
    /// Create an element with `src` set. The element does not start playing.
    async fn create(&self, src: &str) -> Result<ElementId>;

    /// Register a listener receiving every event of `element`.
    async fn add_listener(
        &self,
        element: ElementId,
        listener: MediaElementListener,
    ) -> Result<ListenerToken>;

    async fn remove_listener(&self, element: ElementId, token: ListenerToken) -> Result<()>;

    /// Start playback. Resolves once the element accepted the request.
    async fn play(&self, element: ElementId) -> Result<()>;

    async fn pause(&self, element: ElementId) -> Result<()>;

    /// Seek to `seconds` from the start.
    async fn set_current_time(&self, element: ElementId, seconds: f64) -> Result<()>;

    /// Stop, clear the source and free the element. Releasing an unknown
    /// element is an error.
    async fn release(&self, element: ElementId) -> Result<()>;
}

// ============================================================================
// Native audio engine
// ============================================================================

/// Status snapshot pushed by the native engine.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SoundStatus {
    pub is_loaded: bool,
    pub position_ms: u64,
    /// `None` while the engine has not determined the duration.
    pub duration_ms: Option<u64>,
    pub is_playing: bool,
    pub is_buffering: bool,
    pub did_just_finish: bool,
    /// Set on unloaded statuses caused by a fatal engine error.
    pub error: Option<String>,
}

impl SoundStatus {
    pub fn loaded(position_ms: u64, duration_ms: Option<u64>, is_playing: bool) -> Self {
        Self {
            is_loaded: true,
            position_ms,
            duration_ms,
            is_playing,
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

pub type SoundStatusListener = Arc<dyn Fn(SoundStatus) + Send + Sync>;

/// How the app's audio behaves relative to other apps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InterruptionMode {
    DoNotMix,
    DuckOthers,
    MixWithOthers,
}

/// Platform audio session configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioSessionConfig {
    pub plays_in_silent_mode: bool,
    pub stays_active_in_background: bool,
    pub interruption_mode: InterruptionMode,
    pub should_duck_others: bool,
}

impl Default for AudioSessionConfig {
    fn default() -> Self {
        Self {
            plays_in_silent_mode: true,
            stays_active_in_background: true,
            interruption_mode: InterruptionMode::DoNotMix,
            should_duck_others: false,
        }
    }
}

/// Native audio engine primitive.
#[async_trait]
pub trait NativeAudioEngine: Send + Sync {
    async fn configure_session(&self, config: AudioSessionConfig) -> Result<()>;

    /// Load a sound from a local file URI.
    async fn create_sound(&self, uri: &str) -> Result<SoundId>;

    /// Install the status listener, replacing any previous one.
    async fn set_status_listener(&self, sound: SoundId, listener: SoundStatusListener)
        -> Result<()>;

    async fn clear_status_listener(&self, sound: SoundId) -> Result<()>;

    async fn play(&self, sound: SoundId) -> Result<()>;

    async fn pause(&self, sound: SoundId) -> Result<()>;

    async fn set_position(&self, sound: SoundId, position_ms: u64) -> Result<()>;

    /// Free the sound. Unloading an unknown sound is an error.
    async fn unload(&self, sound: SoundId) -> Result<()>;
}
