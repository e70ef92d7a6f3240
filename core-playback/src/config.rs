//! # Playback Configuration
//!
//! Tuning values for the backend adapters and the session controller.

use bridge_traits::AudioSessionConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Session controller and backend configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackConfig {
    /// Leading-edge window for `resume_track`. Calls arriving within the
    /// window of the previous call are dropped and extend the window.
    ///
    /// Default: 300 ms.
    #[serde(default = "default_resume_debounce")]
    pub resume_debounce: Duration,

    /// Extra `resolve` attempts the native backend makes after a failed
    /// download before giving up on the track.
    ///
    /// Default: 1.
    #[serde(default = "default_native_download_retries")]
    pub native_download_retries: u32,

    /// Applied once, before the first native sound is created.
    #[serde(default)]
    pub audio_session: AudioSessionConfig,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            resume_debounce: default_resume_debounce(),
            native_download_retries: default_native_download_retries(),
            audio_session: AudioSessionConfig::default(),
        }
    }
}

impl PlaybackConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_resume_debounce(mut self, window: Duration) -> Self {
        self.resume_debounce = window;
        self
    }

    pub fn with_native_download_retries(mut self, retries: u32) -> Self {
        self.native_download_retries = retries;
        self
    }

    pub fn with_audio_session(mut self, config: AudioSessionConfig) -> Self {
        self.audio_session = config;
        self
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.resume_debounce > Duration::from_secs(5) {
            return Err("resume_debounce must not exceed 5 seconds".to_string());
        }

        if self.native_download_retries > 5 {
            return Err("native_download_retries must be at most 5".to_string());
        }

        Ok(())
    }
}

fn default_resume_debounce() -> Duration {
    Duration::from_millis(300)
}

fn default_native_download_retries() -> u32 {
    1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PlaybackConfig::default();
        assert_eq!(config.resume_debounce, Duration::from_millis(300));
        assert_eq!(config.native_download_retries, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation() {
        let config = PlaybackConfig::new().with_resume_debounce(Duration::from_secs(10));
        assert!(config.validate().is_err());

        let config = PlaybackConfig::new().with_native_download_retries(9);
        assert!(config.validate().is_err());

        let config = PlaybackConfig::new().with_resume_debounce(Duration::ZERO);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let config: PlaybackConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, PlaybackConfig::default());
    }
}
