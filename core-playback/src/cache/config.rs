//! Download cache configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Upper bound for [`CacheConfig::max_retry_attempts`].
pub const MAX_RETRY_ATTEMPTS: u32 = 10;

/// Where resolved media lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheStorage {
    /// Download into `<data dir>/<media_directory>/` and resolve to a `file://` URI.
    LocalFiles,
    /// No private storage (browser hosts). Resolving records the remote
    /// locator itself without any transfer.
    RemoteOnly,
}

/// Configuration for the download cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Default: `LocalFiles`
    pub storage: CacheStorage,

    /// Directory under the app data directory (default: `music`)
    pub media_directory: String,

    /// Attempts per fetch, including the first (default: 3)
    pub max_retry_attempts: u32,

    /// Upper bound for one attempt (default: 600s)
    pub download_timeout: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            storage: CacheStorage::LocalFiles,
            media_directory: "music".to_string(),
            max_retry_attempts: 3,
            download_timeout: Duration::from_secs(600),
        }
    }
}

impl CacheConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration for hosts without a private media directory.
    pub fn remote_only() -> Self {
        Self {
            storage: CacheStorage::RemoteOnly,
            ..Self::default()
        }
    }

    pub fn with_storage(mut self, storage: CacheStorage) -> Self {
        self.storage = storage;
        self
    }

    pub fn with_media_directory(mut self, dir: impl Into<String>) -> Self {
        self.media_directory = dir.into();
        self
    }

    pub fn with_max_retry_attempts(mut self, attempts: u32) -> Self {
        self.max_retry_attempts = attempts;
        self
    }

    pub fn with_download_timeout(mut self, timeout: Duration) -> Self {
        self.download_timeout = timeout;
        self
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_retry_attempts == 0 {
            return Err("max_retry_attempts must be at least 1".to_string());
        }

        if self.max_retry_attempts > MAX_RETRY_ATTEMPTS {
            return Err(format!(
                "max_retry_attempts cannot exceed {}",
                MAX_RETRY_ATTEMPTS
            ));
        }

        if self.download_timeout.is_zero() {
            return Err("download_timeout must be greater than zero".to_string());
        }

        if self.storage == CacheStorage::LocalFiles && self.media_directory.trim().is_empty() {
            return Err("media_directory cannot be empty".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CacheConfig::default();
        assert_eq!(config.storage, CacheStorage::LocalFiles);
        assert_eq!(config.media_directory, "music");
        assert_eq!(config.max_retry_attempts, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        assert!(CacheConfig::new().with_max_retry_attempts(0).validate().is_err());
        assert!(CacheConfig::new()
            .with_max_retry_attempts(MAX_RETRY_ATTEMPTS)
            .validate()
            .is_ok());
        assert!(CacheConfig::new()
            .with_max_retry_attempts(MAX_RETRY_ATTEMPTS + 1)
            .validate()
            .is_err());
        assert!(CacheConfig::new()
            .with_download_timeout(Duration::ZERO)
            .validate()
            .is_err());
        assert!(CacheConfig::new().with_media_directory("").validate().is_err());

        // Remote-only mode never touches the directory.
        assert!(CacheConfig::remote_only()
            .with_media_directory("")
            .validate()
            .is_ok());
    }
}
