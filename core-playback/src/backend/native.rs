//! Native audio engine backend.

use super::{
    deliver, BackendHandle, BackendKind, HandleId, Resource, StatusSink, StatusUpdate,
    Subscription,
};
use crate::cache::DownloadCache;
use crate::error::{PlaybackError, Result};
use crate::track::Track;
use bridge_traits::{AudioSessionConfig, NativeAudioEngine, SoundId, SoundStatus, SoundStatusListener};
use core_async::sync::OnceCell;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Backend driving a native sound engine. Plays local files only.
pub struct NativeEngineBackend {
    engine: Arc<dyn NativeAudioEngine>,
    cache: DownloadCache,
    download_retries: u32,
    audio_session: AudioSessionConfig,
    session_configured: OnceCell<()>,
}

impl NativeEngineBackend {
    pub fn new(engine: Arc<dyn NativeAudioEngine>, cache: DownloadCache) -> Self {
        Self {
            engine,
            cache,
            download_retries: 1,
            audio_session: AudioSessionConfig::default(),
            session_configured: OnceCell::new(),
        }
    }

    /// Extra `resolve` attempts after a failed download.
    pub fn with_download_retries(mut self, retries: u32) -> Self {
        self.download_retries = retries;
        self
    }

    pub fn with_audio_session(mut self, config: AudioSessionConfig) -> Self {
        self.audio_session = config;
        self
    }

    pub fn cache(&self) -> &DownloadCache {
        &self.cache
    }

    /// Download the track, retrying failed downloads. No streaming fallback.
    #[instrument(skip(self, track), fields(track_id = %track.id()))]
    pub async fn locate(&self, track: &Track) -> Result<String> {
        let mut retries = 0;

        loop {
            match self.cache.resolve(track).await {
                Ok(uri) => return Ok(uri),
                Err(e @ PlaybackError::DownloadFailed { .. }) if retries < self.download_retries => {
                    retries += 1;
                    warn!("Download failed, retrying ({}/{}): {}", retries, self.download_retries, e);
                }
                Err(e) => return Err(e),
            }
        }
    }

    #[instrument(skip(self, sink))]
    pub async fn load(&self, locator: &str, sink: StatusSink) -> Result<BackendHandle> {
        self.ensure_audio_session().await;

        let sound = self
            .engine
            .create_sound(locator)
            .await
            .map_err(|e| PlaybackError::LoadFailed(format!("failed to create sound: {}", e)))?;

        let id = HandleId::new();
        let listener: SoundStatusListener = Arc::new(move |status| {
            if let Some(update) = translate_status(status) {
                deliver(&sink, id, update);
            }
        });

        match self.engine.set_status_listener(sound, listener).await {
            Ok(()) => {
                debug!(%sound, handle = %id, "Sound loaded");
                Ok(BackendHandle::new(
                    id,
                    BackendKind::NativeEngine,
                    Resource::Sound(sound),
                    Subscription::Sound,
                ))
            }
            Err(e) => {
                if let Err(unload_err) = self.engine.unload(sound).await {
                    warn!(%sound, "Failed to unload sound after load error: {}", unload_err);
                }
                Err(PlaybackError::LoadFailed(format!(
                    "failed to attach status listener: {}",
                    e
                )))
            }
        }
    }

    pub async fn play(&self, handle: &BackendHandle) -> Result<()> {
        let sound = sound_of(handle)?;
        self.engine
            .play(sound)
            .await
            .map_err(|e| PlaybackError::PlaybackFailed(e.to_string()))
    }

    pub async fn pause(&self, handle: &BackendHandle) -> Result<()> {
        let sound = sound_of(handle)?;
        self.engine.pause(sound).await?;
        Ok(())
    }

    pub async fn seek(&self, handle: &BackendHandle, position_ms: u64) -> Result<()> {
        let sound = sound_of(handle)?;
        self.engine.set_position(sound, position_ms).await?;
        Ok(())
    }

    pub async fn unload(&self, handle: &BackendHandle) -> Result<()> {
        let Resource::Sound(sound) = handle.resource() else {
            return Err(PlaybackError::Internal(
                "native backend received a streaming handle".to_string(),
            ));
        };
        let mut first_error = None;

        if let Some(Subscription::Sound) = handle.take_subscription() {
            if let Err(e) = self.engine.clear_status_listener(sound).await {
                warn!(%sound, "Failed to clear status listener: {}", e);
                first_error.get_or_insert(PlaybackError::from(e));
            }
        }

        if handle.mark_released() {
            if let Err(e) = self.engine.unload(sound).await {
                warn!(%sound, "Failed to unload sound: {}", e);
                first_error.get_or_insert(PlaybackError::from(e));
            }
            debug!(%sound, handle = %handle.id(), "Sound unloaded");
        }

        first_error.map_or(Ok(()), Err)
    }

    /// Applied once per backend. Failure is logged and not retried.
    async fn ensure_audio_session(&self) {
        self.session_configured
            .get_or_init(|| async {
                match self.engine.configure_session(self.audio_session.clone()).await {
                    Ok(()) => info!("Audio session configured"),
                    Err(e) => warn!("Failed to configure audio session: {}", e),
                }
            })
            .await;
    }
}

fn sound_of(handle: &BackendHandle) -> Result<SoundId> {
    if handle.is_released() {
        return Err(PlaybackError::NoTrackLoaded);
    }
    match handle.resource() {
        Resource::Sound(sound) => Ok(sound),
        Resource::Element(_) => Err(PlaybackError::Internal(
            "native backend received a streaming handle".to_string(),
        )),
    }
}

/// Unloaded statuses without an error carry nothing worth forwarding.
fn translate_status(status: SoundStatus) -> Option<StatusUpdate> {
    if status.is_loaded {
        return Some(StatusUpdate {
            position_ms: Some(status.position_ms),
            duration_ms: status.duration_ms.filter(|ms| *ms > 0),
            is_playing: Some(status.is_playing && !status.did_just_finish),
            is_buffering: Some(status.is_buffering),
            did_finish: status.did_just_finish,
            error: None,
        });
    }

    status.error.map(StatusUpdate::failed)
}
