//! Streaming media element backend.

use super::{
    deliver, BackendHandle, BackendKind, HandleId, Resource, StatusSink, StatusUpdate,
    Subscription,
};
use crate::cache::DownloadCache;
use crate::error::{PlaybackError, Result};
use crate::track::Track;
use bridge_traits::{ElementId, MediaElement, MediaElementEvent, MediaElementListener};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Backend driving a browser-style media element.
pub struct StreamingElementBackend {
    element: Arc<dyn MediaElement>,
    cache: DownloadCache,
}

impl StreamingElementBackend {
    pub fn new(element: Arc<dyn MediaElement>, cache: DownloadCache) -> Self {
        Self { element, cache }
    }

    pub fn cache(&self) -> &DownloadCache {
        &self.cache
    }

    /// Cached URI when the track was resolved earlier, otherwise the remote
    /// locator. Never downloads.
    pub async fn locate(&self, track: &Track) -> Result<String> {
        track.validate()?;

        match self.cache.resolved_uri(track.id()) {
            Some(uri) => {
                debug!(track_id = %track.id(), "Playing cached media");
                Ok(uri)
            }
            None => Ok(track.media_locator().to_string()),
        }
    }

    #[instrument(skip(self, sink))]
    pub async fn load(&self, locator: &str, sink: StatusSink) -> Result<BackendHandle> {
        let element = self
            .element
            .create(locator)
            .await
            .map_err(|e| PlaybackError::LoadFailed(format!("failed to create element: {}", e)))?;

        let id = HandleId::new();
        let listener: MediaElementListener = Arc::new(move |event| {
            deliver(&sink, id, translate_event(event));
        });

        match self.element.add_listener(element, listener).await {
            Ok(token) => {
                debug!(%element, handle = %id, "Media element loaded");
                Ok(BackendHandle::new(
                    id,
                    BackendKind::StreamingElement,
                    Resource::Element(element),
                    Subscription::Element(token),
                ))
            }
            Err(e) => {
                if let Err(release_err) = self.element.release(element).await {
                    warn!(%element, "Failed to release element after load error: {}", release_err);
                }
                Err(PlaybackError::LoadFailed(format!(
                    "failed to attach listener: {}",
                    e
                )))
            }
        }
    }

    pub async fn play(&self, handle: &BackendHandle) -> Result<()> {
        let element = element_of(handle)?;
        self.element
            .play(element)
            .await
            .map_err(|e| PlaybackError::PlaybackFailed(e.to_string()))
    }

    pub async fn pause(&self, handle: &BackendHandle) -> Result<()> {
        let element = element_of(handle)?;
        self.element.pause(element).await?;
        Ok(())
    }

    pub async fn seek(&self, handle: &BackendHandle, position_ms: u64) -> Result<()> {
        let element = element_of(handle)?;
        self.element
            .set_current_time(element, position_ms as f64 / 1000.0)
            .await?;
        Ok(())
    }

    pub async fn unload(&self, handle: &BackendHandle) -> Result<()> {
        let Resource::Element(element) = handle.resource() else {
            return Err(PlaybackError::Internal(
                "streaming backend received a native handle".to_string(),
            ));
        };
        let mut first_error = None;

        if let Some(Subscription::Element(token)) = handle.take_subscription() {
            if let Err(e) = self.element.remove_listener(element, token).await {
                warn!(%element, "Failed to remove listener: {}", e);
                first_error.get_or_insert(PlaybackError::from(e));
            }
        }

        if handle.mark_released() {
            if let Err(e) = self.element.pause(element).await {
                debug!(%element, "Pause before release failed: {}", e);
            }
            if let Err(e) = self.element.release(element).await {
                warn!(%element, "Failed to release element: {}", e);
                first_error.get_or_insert(PlaybackError::from(e));
            }
            debug!(%element, handle = %handle.id(), "Media element released");
        }

        first_error.map_or(Ok(()), Err)
    }
}

fn element_of(handle: &BackendHandle) -> Result<ElementId> {
    if handle.is_released() {
        return Err(PlaybackError::NoTrackLoaded);
    }
    match handle.resource() {
        Resource::Element(element) => Ok(element),
        Resource::Sound(_) => Err(PlaybackError::Internal(
            "streaming backend received a native handle".to_string(),
        )),
    }
}

fn translate_event(event: MediaElementEvent) -> StatusUpdate {
    match event {
        MediaElementEvent::TimeUpdate {
            current_time,
            duration,
            paused,
            ended,
        } => StatusUpdate {
            position_ms: Some(seconds_to_ms(current_time).unwrap_or(0)),
            duration_ms: seconds_to_ms(duration).filter(|ms| *ms > 0),
            is_playing: Some(!paused && !ended),
            ..StatusUpdate::default()
        },
        MediaElementEvent::Waiting => StatusUpdate::buffering(true),
        MediaElementEvent::Playing => StatusUpdate {
            is_playing: Some(true),
            is_buffering: Some(false),
            ..StatusUpdate::default()
        },
        MediaElementEvent::Pause => StatusUpdate::playing(false),
        MediaElementEvent::Ended => StatusUpdate::finished(),
        MediaElementEvent::Error { message } => StatusUpdate::failed(message),
    }
}

/// `None` for non-finite or negative values.
fn seconds_to_ms(seconds: f64) -> Option<u64> {
    if seconds.is_finite() && seconds >= 0.0 {
        Some((seconds * 1000.0).round() as u64)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_update_translation() {
        let update = translate_event(MediaElementEvent::TimeUpdate {
            current_time: 12.3456,
            duration: 180.0,
            paused: false,
            ended: false,
        });
        assert_eq!(update.position_ms, Some(12_346));
        assert_eq!(update.duration_ms, Some(180_000));
        assert_eq!(update.is_playing, Some(true));
        assert!(!update.did_finish);
    }

    #[test]
    fn test_unknown_duration_is_not_sent() {
        for duration in [f64::NAN, f64::INFINITY, 0.0] {
            let update = translate_event(MediaElementEvent::TimeUpdate {
                current_time: 1.0,
                duration,
                paused: true,
                ended: false,
            });
            assert_eq!(update.duration_ms, None);
            assert_eq!(update.is_playing, Some(false));
        }
    }

    #[test]
    fn test_discrete_events() {
        assert_eq!(
            translate_event(MediaElementEvent::Waiting).is_buffering,
            Some(true)
        );

        let playing = translate_event(MediaElementEvent::Playing);
        assert_eq!(playing.is_buffering, Some(false));
        assert_eq!(playing.is_playing, Some(true));

        assert_eq!(
            translate_event(MediaElementEvent::Pause).is_playing,
            Some(false)
        );
        assert!(translate_event(MediaElementEvent::Ended).did_finish);
        assert_eq!(
            translate_event(MediaElementEvent::Error {
                message: "decode".to_string()
            })
            .error
            .as_deref(),
            Some("decode")
        );
    }
}
