//! Core service façade and bootstrap helpers.
//!
//! This crate wires the host-provided bridges from a validated
//! [`CoreConfig`] into a ready [`PlayerService`]: the download cache, the
//! playback backend for the configured platform and the session controller.
//! Desktop apps typically enable the `desktop-shims` feature, which fills in
//! the file system and downloader from `bridge-desktop`.

pub mod error;

pub use error::{CoreError, Result};

pub use core_playback::{
    BackendKind, DownloadProgress, HandleId, PlayOutcome, PlaybackError, PlaybackSession,
    SessionState, Track, TrackId,
};
pub use core_runtime::config::{CoreConfig, CoreConfigBuilder, Platform};
pub use core_runtime::events::{CoreEvent, DownloadEvent, EventStream, PlaybackEvent};
pub use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};

use core_async::sync::watch;
use core_playback::backend::{NativeEngineBackend, PlaybackBackend, StreamingElementBackend};
use core_playback::cache::{CacheConfig, DownloadCache};
use core_playback::{PlaybackConfig, SessionController};
use core_runtime::events::EventBus;
use tracing::info;

/// Primary façade exposed to host applications.
///
/// Cloning is cheap; clones drive the same session.
#[derive(Clone)]
pub struct PlayerService {
    platform: Platform,
    controller: SessionController,
    cache: DownloadCache,
    event_bus: EventBus,
}

impl PlayerService {
    /// Assemble the player for `config.platform`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(config: CoreConfig) -> Result<Self> {
        config.validate()?;

        let event_bus = EventBus::new(config.event_buffer_size);

        let cache = match config.platform {
            Platform::Web => DownloadCache::remote_only(),
            Platform::Native => DownloadCache::new(
                CacheConfig::default()
                    .with_media_directory(config.media_directory.clone())
                    .with_max_retry_attempts(config.max_download_attempts)
                    .with_download_timeout(config.download_timeout),
                config.file_system.clone(),
                config.media_downloader.clone(),
            )?,
        }
        .with_event_bus(event_bus.clone());

        let playback_config = PlaybackConfig::default()
            .with_resume_debounce(config.resume_debounce)
            .with_audio_session(config.audio_session.clone());

        let backend = match config.platform {
            Platform::Web => {
                let element = config.media_element.clone().ok_or_else(|| {
                    missing("MediaElement", "Web hosts must inject a media element adapter.")
                })?;
                PlaybackBackend::from(StreamingElementBackend::new(element, cache.clone()))
            }
            Platform::Native => {
                let engine = config.audio_engine.clone().ok_or_else(|| {
                    missing("NativeAudioEngine", "Native hosts must inject an audio engine adapter.")
                })?;
                PlaybackBackend::from(
                    NativeEngineBackend::new(engine, cache.clone())
                        .with_download_retries(playback_config.native_download_retries)
                        .with_audio_session(playback_config.audio_session.clone()),
                )
            }
        };

        let controller = SessionController::new(backend, playback_config, event_bus.clone())?;
        info!(platform = %config.platform, "Player service ready");

        Ok(Self {
            platform: config.platform,
            controller,
            cache,
            event_bus,
        })
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn backend_kind(&self) -> BackendKind {
        self.controller.backend().kind()
    }

    pub fn controller(&self) -> &SessionController {
        &self.controller
    }

    pub fn cache(&self) -> &DownloadCache {
        &self.cache
    }

    // ------------------------------------------------------------------
    // Session
    // ------------------------------------------------------------------

    pub async fn play_track(&self, track: Track) -> PlayOutcome {
        self.controller.play_track(track).await
    }

    pub async fn pause_track(&self) -> Result<()> {
        Ok(self.controller.pause_track().await?)
    }

    pub async fn resume_track(&self) {
        self.controller.resume_track().await
    }

    pub async fn seek_to(&self, position_ms: u64) -> Result<()> {
        Ok(self.controller.seek_to(position_ms).await?)
    }

    pub async fn cleanup(&self) {
        self.controller.cleanup().await
    }

    pub fn session(&self) -> PlaybackSession {
        self.controller.session()
    }

    pub fn subscribe(&self) -> watch::Receiver<PlaybackSession> {
        self.controller.subscribe()
    }

    // ------------------------------------------------------------------
    // Downloads
    // ------------------------------------------------------------------

    /// Fetch a track ahead of playback.
    pub async fn download_track(&self, track: &Track) -> Result<String> {
        Ok(self.cache.resolve(track).await?)
    }

    pub fn is_downloaded(&self, track_id: &TrackId) -> bool {
        self.cache.is_resolved(track_id)
    }

    pub fn download_progress(&self, track_id: &TrackId) -> Option<DownloadProgress> {
        self.cache.download_progress(track_id)
    }

    // ------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------

    /// All playback and download events.
    pub fn events(&self) -> EventStream {
        EventStream::new(self.event_bus.subscribe())
    }

    pub fn playback_events(&self) -> EventStream {
        self.controller.events()
    }

    pub fn download_events(&self) -> EventStream {
        self.events()
            .filter(|event| matches!(event, CoreEvent::Download(_)))
    }
}

fn missing(capability: &str, message: &str) -> CoreError {
    CoreError::CapabilityMissing {
        capability: capability.to_string(),
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::{
        error::Result as BridgeResult, ElementId, ListenerToken, MediaElement,
        MediaElementListener,
    };
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;

    #[derive(Default)]
    struct SilentElement {
        next: AtomicU64,
    }

    #[async_trait]
    impl MediaElement for SilentElement {
        async fn create(&self, _src: &str) -> BridgeResult<ElementId> {
            Ok(ElementId(self.next.fetch_add(1, Ordering::SeqCst)))
        }

        async fn add_listener(
            &self,
            element: ElementId,
            _listener: MediaElementListener,
        ) -> BridgeResult<ListenerToken> {
            Ok(ListenerToken(element.0))
        }

        async fn remove_listener(&self, _: ElementId, _: ListenerToken) -> BridgeResult<()> {
            Ok(())
        }

        async fn play(&self, _: ElementId) -> BridgeResult<()> {
            Ok(())
        }

        async fn pause(&self, _: ElementId) -> BridgeResult<()> {
            Ok(())
        }

        async fn set_current_time(&self, _: ElementId, _: f64) -> BridgeResult<()> {
            Ok(())
        }

        async fn release(&self, _: ElementId) -> BridgeResult<()> {
            Ok(())
        }
    }

    fn web_config() -> CoreConfig {
        CoreConfig::builder()
            .platform(Platform::Web)
            .media_element(Arc::new(SilentElement::default()))
            .build()
            .unwrap()
    }

    #[test]
    fn test_runtime_errors_convert() {
        let err: CoreError = CoreConfig::builder()
            .platform(Platform::Web)
            .build()
            .unwrap_err()
            .into();

        match err {
            CoreError::CapabilityMissing { capability, .. } => {
                assert_eq!(capability, "MediaElement")
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_web_player_streams_remote_locators() {
        let player = PlayerService::new(web_config()).unwrap();
        assert_eq!(player.platform(), Platform::Web);
        assert_eq!(player.backend_kind(), BackendKind::StreamingElement);

        let track = Track::new("1", "Song", "Artist", "https://cdn.example.com/1.mp3");
        assert!(player.play_track(track.clone()).await.is_started());
        assert_eq!(player.session().track_id(), Some("1"));

        // Web hosts record the remote locator instead of downloading.
        let uri = player.download_track(&track).await.unwrap();
        assert_eq!(uri, "https://cdn.example.com/1.mp3");
        assert!(player.is_downloaded(track.id()));

        player.cleanup().await;
        assert!(player.session().is_empty());
    }

    #[tokio::test]
    async fn test_seek_without_track_is_a_playback_error() {
        let player = PlayerService::new(web_config()).unwrap();
        assert!(matches!(
            player.seek_to(10).await,
            Err(CoreError::Playback(PlaybackError::NoTrackLoaded))
        ));
    }
}
