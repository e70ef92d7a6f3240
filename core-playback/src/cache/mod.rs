//! # Download Cache Module
//!
//! Resolves tracks to locally playable URIs.
//!
//! ## Overview
//!
//! The native backend plays only local files, so every track is downloaded
//! into the app's private media directory before its first play. The
//! streaming backend consults the cache opportunistically and otherwise
//! plays the remote locator directly.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────┐
//! │       DownloadCache         │
//! │  resolved: id -> URI        │
//! │  in_flight: id -> Shared    │
//! └──────────────┬──────────────┘
//!                │
//!       ┌────────┴─────────┐
//!       │                  │
//! ┌─────▼──────┐   ┌───────▼────────┐
//! │ FileSystem │   │ MediaDownloader│
//! │  Access    │   │  (Range resume)│
//! └────────────┘   └────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use core_playback::cache::{CacheConfig, DownloadCache};
//!
//! let cache = DownloadCache::new(CacheConfig::default(), Some(fs), Some(downloader))?
//!     .with_event_bus(event_bus);
//!
//! let uri = cache.resolve(&track).await?;
//! assert!(cache.is_resolved(track.id()));
//! ```

pub mod config;
pub mod manager;
pub mod stats;

pub use config::{CacheConfig, CacheStorage, MAX_RETRY_ATTEMPTS};
pub use manager::DownloadCache;
pub use stats::{CacheStats, DownloadProgress};
