//! Track references handed over by the catalog.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{PlaybackError, Result};

/// Opaque, unique track identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackId(String);

impl TrackId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TrackId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for TrackId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// An immutable description of a playable item.
///
/// Produced by the catalog (usually deserialized from JSON) and cloned into
/// the playback session for as long as it lasts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    id: TrackId,
    title: String,
    artist: String,
    #[serde(default, rename = "artwork")]
    artwork_locator: Option<String>,
    #[serde(rename = "url")]
    media_locator: String,
}

impl Track {
    pub fn new(
        id: impl Into<TrackId>,
        title: impl Into<String>,
        artist: impl Into<String>,
        media_locator: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            artist: artist.into(),
            artwork_locator: None,
            media_locator: media_locator.into(),
        }
    }

    pub fn with_artwork(mut self, locator: impl Into<String>) -> Self {
        self.artwork_locator = Some(locator.into());
        self
    }

    pub fn id(&self) -> &TrackId {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn artist(&self) -> &str {
        &self.artist
    }

    pub fn artwork_locator(&self) -> Option<&str> {
        self.artwork_locator.as_deref()
    }

    pub fn media_locator(&self) -> &str {
        &self.media_locator
    }

    /// Rejects references that no backend could play.
    pub fn validate(&self) -> Result<()> {
        if self.id.as_str().trim().is_empty() {
            return Err(PlaybackError::InvalidTrack("empty track id".to_string()));
        }
        if self.media_locator.trim().is_empty() {
            return Err(PlaybackError::InvalidTrack(format!(
                "track {} has no media locator",
                self.id
            )));
        }
        Ok(())
    }
}
