//! # Session Controller
//!
//! Owns the single playback session and its backend handle.
//!
//! ## Guarantees
//!
//! - At most one handle is live: `play_track` unloads the current handle
//!   before it loads the next one.
//! - A `play_track` that was overtaken by a newer `play_track` or a
//!   `cleanup` unloads whatever it loaded and reports `Superseded`.
//! - Status events are applied only when they carry the current handle id.
//! - `cleanup` never fails and can be called any number of times.
//!
//! The aggregate sits behind a `parking_lot::Mutex` that is never held
//! across an await. Status events are applied by one pump task.

use crate::backend::{BackendHandle, HandleId, PlaybackBackend, StatusEvent};
use crate::config::PlaybackConfig;
use crate::error::{PlaybackError, Result};
use crate::session::debounce::Debouncer;
use crate::session::state::{PlaybackSession, SessionState};
use crate::track::Track;
use core_async::sync::{mpsc, watch};
use core_async::time::Instant;
use core_runtime::events::{CoreEvent, EventBus, EventStream, PlaybackEvent, PlaybackFailure};
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use tracing::{debug, error, info, instrument, warn};

/// Result of [`SessionController::play_track`].
#[derive(Debug)]
pub enum PlayOutcome {
    /// The track is playing on the returned handle.
    Started(HandleId),
    /// A newer request took over while this one was loading.
    Superseded,
    /// Loading or starting failed. The session is idle.
    Failed(PlaybackError),
}

impl PlayOutcome {
    pub fn is_started(&self) -> bool {
        matches!(self, PlayOutcome::Started(_))
    }

    pub fn handle_id(&self) -> Option<HandleId> {
        match self {
            PlayOutcome::Started(id) => Some(*id),
            _ => None,
        }
    }
}

struct ControllerState {
    session: PlaybackSession,
    handle: Option<BackendHandle>,
    play_generation: u64,
    debouncer: Debouncer,
}

impl ControllerState {
    fn owns(&self, handle: &BackendHandle) -> bool {
        self.session.handle == Some(handle.id())
    }

    /// Reset to the empty session, returning what was live.
    fn take_live(&mut self) -> (Option<BackendHandle>, Option<Track>) {
        let handle = self.handle.take();
        let track = self.session.track.take();
        self.session = PlaybackSession::empty();
        (handle, track)
    }
}

struct Inner {
    backend: PlaybackBackend,
    state: Mutex<ControllerState>,
    snapshot: watch::Sender<PlaybackSession>,
    event_bus: EventBus,
    status_tx: mpsc::UnboundedSender<StatusEvent>,
}

/// Drives the playback session. Clones share the same session.
#[derive(Clone)]
pub struct SessionController {
    inner: Arc<Inner>,
}

impl SessionController {
    /// Create a controller and start its status pump.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(backend: PlaybackBackend, config: PlaybackConfig, event_bus: EventBus) -> Result<Self> {
        config
            .validate()
            .map_err(|e| PlaybackError::Internal(format!("Invalid playback configuration: {}", e)))?;

        let (status_tx, status_rx) = mpsc::unbounded_channel();
        let (snapshot, _) = watch::channel(PlaybackSession::empty());

        let inner = Arc::new(Inner {
            backend,
            state: Mutex::new(ControllerState {
                session: PlaybackSession::empty(),
                handle: None,
                play_generation: 0,
                debouncer: Debouncer::new(config.resume_debounce),
            }),
            snapshot,
            event_bus,
            status_tx,
        });

        core_async::spawn(status_pump(Arc::downgrade(&inner), status_rx));
        info!(backend = %inner.backend.kind(), "Session controller ready");

        Ok(Self { inner })
    }

    pub fn backend(&self) -> &PlaybackBackend {
        &self.inner.backend
    }

    /// Current session snapshot.
    pub fn session(&self) -> PlaybackSession {
        self.inner.state.lock().session.clone()
    }

    /// Receiver that observes every session change.
    pub fn subscribe(&self) -> watch::Receiver<PlaybackSession> {
        self.inner.snapshot.subscribe()
    }

    /// Playback events from the event bus.
    pub fn events(&self) -> EventStream {
        EventStream::new(self.inner.event_bus.subscribe())
            .filter(|event| matches!(event, CoreEvent::Playback(_)))
    }

    /// Replace whatever is playing with `track`.
    ///
    /// Never returns an error: load and play failures are reported as
    /// [`PlayOutcome::Failed`] after the session has been reset.
    #[instrument(skip(self, track), fields(track_id = %track.id()))]
    pub async fn play_track(&self, track: Track) -> PlayOutcome {
        let (generation, previous, previous_track) = {
            let mut state = self.inner.state.lock();
            state.play_generation += 1;
            state.debouncer.reset();
            let (handle, track) = state.take_live();
            state.session = PlaybackSession::loading();
            self.publish(&state);
            (state.play_generation, handle, track)
        };

        if let Some(handle) = previous {
            self.release(&handle).await;
        }
        if let Some(previous_track) = previous_track {
            self.emit(PlaybackEvent::Stopped {
                track_id: previous_track.id().to_string(),
            });
        }

        if !self.is_current(generation) {
            return PlayOutcome::Superseded;
        }

        self.emit(PlaybackEvent::Loading {
            track_id: track.id().to_string(),
        });

        let locator = match self.inner.backend.locate(&track).await {
            Ok(locator) => locator,
            Err(e) => {
                let error = PlaybackError::LoadFailed(e.to_string());
                return self.fail_loading(generation, &track, error);
            }
        };

        if !self.is_current(generation) {
            return PlayOutcome::Superseded;
        }

        let handle = match self
            .inner
            .backend
            .load(&locator, self.inner.status_tx.clone())
            .await
        {
            Ok(handle) => handle,
            Err(e) => {
                let error = match e {
                    PlaybackError::LoadFailed(_) => e,
                    other => PlaybackError::LoadFailed(other.to_string()),
                };
                return self.fail_loading(generation, &track, error);
            }
        };

        let installed = {
            let mut state = self.inner.state.lock();
            if state.play_generation == generation {
                state.handle = Some(handle.clone());
                state.session.attach(track.clone(), handle.id());
                self.publish(&state);
                true
            } else {
                false
            }
        };

        if !installed {
            debug!(handle = %handle.id(), "Request superseded during load, unloading");
            self.release(&handle).await;
            return PlayOutcome::Superseded;
        }

        match self.inner.backend.play(&handle).await {
            Ok(()) => self.confirm_started(&track, &handle).await,
            Err(e) => {
                let owned = {
                    let mut state = self.inner.state.lock();
                    if state.owns(&handle) {
                        state.take_live();
                        self.publish(&state);
                        true
                    } else {
                        false
                    }
                };

                if !owned {
                    self.release(&handle).await;
                    return PlayOutcome::Superseded;
                }

                self.release(&handle).await;
                error!("Playback failed to start: {}", e);
                self.emit(PlaybackEvent::Error {
                    track_id: Some(track.id().to_string()),
                    kind: PlaybackFailure::PlaybackFailed,
                    message: e.to_string(),
                });

                let error = match e {
                    PlaybackError::PlaybackFailed(_) => e,
                    other => PlaybackError::PlaybackFailed(other.to_string()),
                };
                PlayOutcome::Failed(error)
            }
        }
    }

    /// Pause the current track. No-op when idle or already paused.
    ///
    /// Backend errors are returned and leave the session unchanged.
    #[instrument(skip(self))]
    pub async fn pause_track(&self) -> Result<()> {
        let handle = {
            let state = self.inner.state.lock();
            match (&state.handle, state.session.state) {
                (Some(_), SessionState::Paused) | (None, _) => return Ok(()),
                (Some(handle), _) => handle.clone(),
            }
        };

        if let Err(e) = self.inner.backend.pause(&handle).await {
            warn!("Pause failed: {}", e);
            return Err(e);
        }

        let paused = {
            let mut state = self.inner.state.lock();
            if state.owns(&handle) {
                state.debouncer.reset();
                state.session.is_playing = false;
                state.session.state = SessionState::Paused;
                self.publish(&state);
                Some((state.session.track_id().map(str::to_string), state.session.position_ms))
            } else {
                None
            }
        };

        if let Some((Some(track_id), position_ms)) = paused {
            self.emit(PlaybackEvent::Paused {
                track_id,
                position_ms,
            });
        }
        Ok(())
    }

    /// Resume the current track. No-op without a handle.
    ///
    /// Debounced on the leading edge: calls inside the window of the
    /// previous call are dropped. A pause reopens the window. Failures are
    /// logged and leave the session paused.
    #[instrument(skip(self))]
    pub async fn resume_track(&self) {
        let (handle, generation) = {
            let mut state = self.inner.state.lock();
            let Some(handle) = state.handle.clone() else {
                debug!("Resume ignored, nothing loaded");
                return;
            };
            match state.debouncer.admit(Instant::now()) {
                Some(generation) => (handle, generation),
                None => {
                    debug!("Resume dropped by debounce");
                    return;
                }
            }
        };

        match self.inner.backend.play(&handle).await {
            Ok(()) => {
                let resumed = {
                    let mut state = self.inner.state.lock();
                    if state.owns(&handle) && state.debouncer.is_current(generation) {
                        state.session.is_playing = true;
                        state.session.state = SessionState::Playing;
                        self.publish(&state);
                        Some((state.session.track_id().map(str::to_string), state.session.position_ms))
                    } else {
                        None
                    }
                };

                if let Some((Some(track_id), position_ms)) = resumed {
                    self.emit(PlaybackEvent::Resumed {
                        track_id,
                        position_ms,
                    });
                }
            }
            Err(e) => {
                let error = PlaybackError::ResumeFailed(e.to_string());
                warn!("{}", error);

                let mut state = self.inner.state.lock();
                if state.owns(&handle) {
                    state.session.is_playing = false;
                    if state.session.state == SessionState::Playing {
                        state.session.state = SessionState::Paused;
                    }
                    self.publish(&state);
                }
            }
        }
    }

    /// Seek the current track. The position updates once the backend reports it.
    #[instrument(skip(self))]
    pub async fn seek_to(&self, position_ms: u64) -> Result<()> {
        let handle = self
            .inner
            .state
            .lock()
            .handle
            .clone()
            .ok_or(PlaybackError::NoTrackLoaded)?;

        self.inner
            .backend
            .seek(&handle, position_ms)
            .await
            .map_err(|e| {
                warn!("Seek failed: {}", e);
                e
            })
    }

    /// Tear down the session. Never fails; safe to call repeatedly.
    ///
    /// Also invalidates any `play_track` still loading.
    #[instrument(skip(self))]
    pub async fn cleanup(&self) {
        let (handle, track) = {
            let mut state = self.inner.state.lock();
            state.play_generation += 1;
            state.debouncer.reset();
            let live = state.take_live();
            self.publish(&state);
            live
        };

        if let Some(handle) = handle {
            self.release(&handle).await;
        }
        if let Some(track) = track {
            info!(track_id = %track.id(), "Session cleaned up");
            self.emit(PlaybackEvent::Stopped {
                track_id: track.id().to_string(),
            });
        }
    }

    async fn confirm_started(&self, track: &Track, handle: &BackendHandle) -> PlayOutcome {
        let confirmed = {
            let mut state = self.inner.state.lock();
            if !state.owns(handle) {
                None
            } else {
                let paused_meanwhile = state.session.state == SessionState::Paused;
                if !paused_meanwhile {
                    state.session.state = SessionState::Playing;
                    state.session.is_playing = true;
                }
                self.publish(&state);
                Some(paused_meanwhile)
            }
        };

        match confirmed {
            None => PlayOutcome::Superseded,
            Some(paused_meanwhile) => {
                if paused_meanwhile {
                    // The user paused while the track was loading.
                    if let Err(e) = self.inner.backend.pause(handle).await {
                        warn!("Failed to re-apply pause: {}", e);
                    }
                }

                info!(handle = %handle.id(), "Playback started");
                self.emit(PlaybackEvent::Started {
                    track_id: track.id().to_string(),
                    title: track.title().to_string(),
                    backend: self.inner.backend.kind().to_string(),
                });
                PlayOutcome::Started(handle.id())
            }
        }
    }

    fn fail_loading(&self, generation: u64, track: &Track, error: PlaybackError) -> PlayOutcome {
        {
            let mut state = self.inner.state.lock();
            if state.play_generation != generation {
                return PlayOutcome::Superseded;
            }
            state.take_live();
            self.publish(&state);
        }

        error!("Failed to load track: {}", error);
        self.emit(PlaybackEvent::Error {
            track_id: Some(track.id().to_string()),
            kind: PlaybackFailure::LoadFailed,
            message: error.to_string(),
        });
        PlayOutcome::Failed(error)
    }

    async fn handle_status(&self, event: StatusEvent) {
        enum Outcome {
            Ignored,
            Applied(Vec<PlaybackEvent>),
            Finished(Option<BackendHandle>, Option<Track>),
            Failed(Option<BackendHandle>, Option<Track>, String),
        }

        let outcome = {
            let mut state = self.inner.state.lock();

            if state.session.handle != Some(event.handle) {
                Outcome::Ignored
            } else if event.update.did_finish {
                let (handle, track) = state.take_live();
                self.publish(&state);
                Outcome::Finished(handle, track)
            } else if let Some(message) = event.update.error.clone() {
                let (handle, track) = state.take_live();
                self.publish(&state);
                Outcome::Failed(handle, track, message)
            } else {
                let delta = state.session.apply(&event.update);
                self.publish(&state);

                let session = &state.session;
                let track_id = session.track_id().unwrap_or_default().to_string();
                let mut events = Vec::new();
                if delta.position_changed {
                    events.push(PlaybackEvent::PositionChanged {
                        track_id: track_id.clone(),
                        position_ms: session.position_ms,
                        duration_ms: session.duration_ms,
                    });
                }
                if delta.buffering_changed {
                    events.push(PlaybackEvent::BufferingChanged {
                        track_id,
                        is_buffering: session.is_buffering,
                    });
                }
                Outcome::Applied(events)
            }
        };

        match outcome {
            Outcome::Ignored => {
                debug!(handle = %event.handle, "Discarding status from stale handle");
            }
            Outcome::Applied(events) => {
                for event in events {
                    self.emit(event);
                }
            }
            Outcome::Finished(handle, track) => {
                if let Some(handle) = handle {
                    self.release(&handle).await;
                }
                if let Some(track) = track {
                    info!(track_id = %track.id(), "Track finished");
                    self.emit(PlaybackEvent::Completed {
                        track_id: track.id().to_string(),
                    });
                }
            }
            Outcome::Failed(handle, track, message) => {
                if let Some(handle) = handle {
                    self.release(&handle).await;
                }
                error!("Backend reported playback error: {}", message);
                self.emit(PlaybackEvent::Error {
                    track_id: track.map(|t| t.id().to_string()),
                    kind: PlaybackFailure::PlaybackFailed,
                    message,
                });
            }
        }
    }

    fn is_current(&self, generation: u64) -> bool {
        self.inner.state.lock().play_generation == generation
    }

    /// Unload a handle, logging and swallowing any error.
    async fn release(&self, handle: &BackendHandle) {
        if let Err(e) = self.inner.backend.unload(handle).await {
            warn!(handle = %handle.id(), "Error while unloading handle: {}", e);
        }
    }

    fn publish(&self, state: &ControllerState) {
        self.inner.snapshot.send_if_modified(|current| {
            if *current == state.session {
                false
            } else {
                *current = state.session.clone();
                true
            }
        });
    }

    fn emit(&self, event: PlaybackEvent) {
        // No subscribers is fine.
        let _ = self.inner.event_bus.emit(CoreEvent::Playback(event));
    }
}

async fn status_pump(inner: Weak<Inner>, mut status_rx: mpsc::UnboundedReceiver<StatusEvent>) {
    while let Some(event) = status_rx.recv().await {
        let Some(inner) = inner.upgrade() else {
            break;
        };
        SessionController { inner }.handle_status(event).await;
    }
    debug!("Status pump stopped");
}
