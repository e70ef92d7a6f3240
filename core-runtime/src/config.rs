//! # Core Configuration Module
//!
//! Builder-based configuration for the player core.
//!
//! ## Overview
//!
//! [`CoreConfig`] collects the host bridges and tuning values the player
//! needs. The builder fails fast: if the selected [`Platform`] lacks one of
//! its required capabilities, `build()` returns
//! [`Error::CapabilityMissing`] naming the capability and how to supply it.
//!
//! ## Required capabilities
//!
//! | Platform | Required |
//! |----------|----------|
//! | `Web`    | `MediaElement` |
//! | `Native` | `NativeAudioEngine`, `FileSystemAccess`, `MediaDownloader` |
//!
//! When the `desktop-shims` feature is enabled, `FileSystemAccess` and
//! `MediaDownloader` default to the `bridge-desktop` implementations. There
//! is never a default playback primitive.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::{CoreConfig, Platform};
//! use std::sync::Arc;
//!
//! let config = CoreConfig::builder()
//!     .platform(Platform::Native)
//!     .audio_engine(Arc::new(MyEngine::new()))
//!     .file_system(Arc::new(MyFileSystem))
//!     .media_downloader(Arc::new(MyDownloader))
//!     .resume_debounce(Duration::from_millis(250))
//!     .build()?;
//! ```

use crate::error::{Error, Result};
use crate::events::DEFAULT_EVENT_BUFFER_SIZE;
use bridge_traits::{
    AudioSessionConfig, FileSystemAccess, MediaDownloader, MediaElement, NativeAudioEngine,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Default leading-edge window for `resume_track`.
pub const DEFAULT_RESUME_DEBOUNCE: Duration = Duration::from_millis(300);

/// Default number of attempts per media download.
pub const DEFAULT_DOWNLOAD_ATTEMPTS: u32 = 3;

/// Default upper bound for a single download attempt.
pub const DEFAULT_DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(600);

/// Host platform family. Decides which playback backend serves sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    /// Browser hosts: streaming media element, no private media directory.
    Web,
    /// iOS/Android/desktop hosts: native engine playing downloaded files.
    Native,
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::Web => f.write_str("web"),
            Platform::Native => f.write_str("native"),
        }
    }
}

/// Core configuration.
///
/// Construct with [`CoreConfig::builder`]. Capabilities that the platform
/// does not use may still be present; they are ignored.
#[derive(Clone)]
pub struct CoreConfig {
    pub platform: Platform,
    pub file_system: Option<Arc<dyn FileSystemAccess>>,
    pub media_downloader: Option<Arc<dyn MediaDownloader>>,
    pub media_element: Option<Arc<dyn MediaElement>>,
    pub audio_engine: Option<Arc<dyn NativeAudioEngine>>,
    /// Directory under the data directory that holds downloaded media.
    pub media_directory: String,
    pub max_download_attempts: u32,
    pub download_timeout: Duration,
    pub resume_debounce: Duration,
    pub event_buffer_size: usize,
    pub audio_session: AudioSessionConfig,
}

impl fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoreConfig")
            .field("platform", &self.platform)
            .field("file_system", &self.file_system.is_some())
            .field("media_downloader", &self.media_downloader.is_some())
            .field("media_element", &self.media_element.is_some())
            .field("audio_engine", &self.audio_engine.is_some())
            .field("media_directory", &self.media_directory)
            .field("max_download_attempts", &self.max_download_attempts)
            .field("download_timeout", &self.download_timeout)
            .field("resume_debounce", &self.resume_debounce)
            .field("event_buffer_size", &self.event_buffer_size)
            .finish()
    }
}

impl CoreConfig {
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Check capability presence for the platform and value ranges.
    pub fn validate(&self) -> Result<()> {
        match self.platform {
            Platform::Web => {
                if self.media_element.is_none() {
                    return Err(capability_missing(
                        "MediaElement",
                        "Web hosts must inject a browser media element adapter.",
                    ));
                }
            }
            Platform::Native => {
                if self.audio_engine.is_none() {
                    return Err(capability_missing(
                        "NativeAudioEngine",
                        "Native hosts must inject the platform audio engine adapter.",
                    ));
                }
                if self.file_system.is_none() {
                    return Err(capability_missing(
                        "FileSystemAccess",
                        "Desktop: enable the 'desktop-shims' feature. \
                         Mobile: inject the app-sandbox file system adapter.",
                    ));
                }
                if self.media_downloader.is_none() {
                    return Err(capability_missing(
                        "MediaDownloader",
                        "Desktop: enable the 'desktop-shims' feature. \
                         Mobile: inject the platform download adapter.",
                    ));
                }
            }
        }

        let media_directory = self.media_directory.trim();
        if media_directory.is_empty() {
            return Err(Error::Config("Media directory cannot be empty".to_string()));
        }
        if media_directory.contains("..") || media_directory.starts_with('/') {
            return Err(Error::Config(format!(
                "Media directory must be relative to the data directory: {}",
                self.media_directory
            )));
        }

        if self.max_download_attempts == 0 {
            return Err(Error::Config(
                "max_download_attempts must be at least 1".to_string(),
            ));
        }

        if self.download_timeout.is_zero() {
            return Err(Error::Config(
                "download_timeout must be greater than zero".to_string(),
            ));
        }

        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "event_buffer_size must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

fn capability_missing(capability: &str, hint: &str) -> Error {
    Error::CapabilityMissing {
        capability: capability.to_string(),
        message: hint.to_string(),
    }
}

#[cfg(feature = "desktop-shims")]
fn default_file_system() -> Option<Arc<dyn FileSystemAccess>> {
    Some(Arc::new(bridge_desktop::TokioFileSystem::new()))
}

#[cfg(not(feature = "desktop-shims"))]
fn default_file_system() -> Option<Arc<dyn FileSystemAccess>> {
    None
}

#[cfg(feature = "desktop-shims")]
fn default_media_downloader() -> Option<Arc<dyn MediaDownloader>> {
    Some(Arc::new(bridge_desktop::ReqwestMediaDownloader::new()))
}

#[cfg(not(feature = "desktop-shims"))]
fn default_media_downloader() -> Option<Arc<dyn MediaDownloader>> {
    None
}

/// Builder for [`CoreConfig`].
#[derive(Default)]
pub struct CoreConfigBuilder {
    platform: Option<Platform>,
    file_system: Option<Arc<dyn FileSystemAccess>>,
    media_downloader: Option<Arc<dyn MediaDownloader>>,
    media_element: Option<Arc<dyn MediaElement>>,
    audio_engine: Option<Arc<dyn NativeAudioEngine>>,
    media_directory: Option<String>,
    max_download_attempts: Option<u32>,
    download_timeout: Option<Duration>,
    resume_debounce: Option<Duration>,
    event_buffer_size: Option<usize>,
    audio_session: Option<AudioSessionConfig>,
}

impl CoreConfigBuilder {
    /// Selects the backend family. Required.
    pub fn platform(mut self, platform: Platform) -> Self {
        self.platform = Some(platform);
        self
    }

    /// Sets the file system used by the download cache.
    ///
    /// Defaults to `TokioFileSystem` under `desktop-shims` on native hosts.
    pub fn file_system(mut self, fs: Arc<dyn FileSystemAccess>) -> Self {
        self.file_system = Some(fs);
        self
    }

    /// Sets the downloader used by the download cache.
    ///
    /// Defaults to `ReqwestMediaDownloader` under `desktop-shims` on native hosts.
    pub fn media_downloader(mut self, downloader: Arc<dyn MediaDownloader>) -> Self {
        self.media_downloader = Some(downloader);
        self
    }

    pub fn media_element(mut self, element: Arc<dyn MediaElement>) -> Self {
        self.media_element = Some(element);
        self
    }

    pub fn audio_engine(mut self, engine: Arc<dyn NativeAudioEngine>) -> Self {
        self.audio_engine = Some(engine);
        self
    }

    /// Default: `music`
    pub fn media_directory(mut self, dir: impl Into<String>) -> Self {
        self.media_directory = Some(dir.into());
        self
    }

    /// Default: 3
    pub fn max_download_attempts(mut self, attempts: u32) -> Self {
        self.max_download_attempts = Some(attempts);
        self
    }

    /// Default: 10 minutes
    pub fn download_timeout(mut self, timeout: Duration) -> Self {
        self.download_timeout = Some(timeout);
        self
    }

    /// Default: 300 ms
    pub fn resume_debounce(mut self, window: Duration) -> Self {
        self.resume_debounce = Some(window);
        self
    }

    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    pub fn audio_session(mut self, config: AudioSessionConfig) -> Self {
        self.audio_session = Some(config);
        self
    }

    /// Build and validate.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] when no platform was selected or a value is out of range
    /// - [`Error::CapabilityMissing`] when the platform lacks a required bridge
    pub fn build(self) -> Result<CoreConfig> {
        let platform = self.platform.ok_or_else(|| {
            Error::Config("Platform is required. Use .platform() to set it.".to_string())
        })?;

        let (file_system, media_downloader) = match platform {
            Platform::Native => (
                self.file_system.or_else(default_file_system),
                self.media_downloader.or_else(default_media_downloader),
            ),
            Platform::Web => (self.file_system, self.media_downloader),
        };

        let config = CoreConfig {
            platform,
            file_system,
            media_downloader,
            media_element: self.media_element,
            audio_engine: self.audio_engine,
            media_directory: self.media_directory.unwrap_or_else(|| "music".to_string()),
            max_download_attempts: self
                .max_download_attempts
                .unwrap_or(DEFAULT_DOWNLOAD_ATTEMPTS),
            download_timeout: self.download_timeout.unwrap_or(DEFAULT_DOWNLOAD_TIMEOUT),
            resume_debounce: self.resume_debounce.unwrap_or(DEFAULT_RESUME_DEBOUNCE),
            event_buffer_size: self.event_buffer_size.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
            audio_session: self.audio_session.unwrap_or_default(),
        };

        config.validate()?;
        Ok(config)
    }
}
