//! # Playback Session Core
//!
//! Plays one track at a time on whichever audio primitive the host offers.
//!
//! ## Overview
//!
//! This crate handles:
//! - Track references handed over by the catalog
//! - A download cache that turns remote locators into local files
//! - Two playback backends (streaming media element, native audio engine)
//!   behind one capability set
//! - The session controller: one live handle, clean teardown between
//!   tracks, stale status rejection, debounced resume
//!
//! ## Example
//!
//! ```rust,ignore
//! use core_playback::{
//!     backend::{PlaybackBackend, StreamingElementBackend},
//!     cache::DownloadCache,
//!     PlaybackConfig, SessionController, Track,
//! };
//!
//! let cache = DownloadCache::remote_only();
//! let backend = PlaybackBackend::from(StreamingElementBackend::new(element, cache));
//! let controller = SessionController::new(backend, PlaybackConfig::default(), event_bus)?;
//!
//! let outcome = controller.play_track(track).await;
//! assert!(outcome.is_started());
//! controller.pause_track().await?;
//! controller.cleanup().await;
//! ```

pub mod backend;
pub mod cache;
pub mod config;
pub mod error;
pub mod session;
pub mod track;

pub use backend::{BackendHandle, BackendKind, HandleId, PlaybackBackend, StatusEvent, StatusUpdate};
pub use cache::{CacheConfig, CacheStorage, DownloadCache, DownloadProgress};
pub use config::PlaybackConfig;
pub use error::{PlaybackError, Result};
pub use session::{PlayOutcome, PlaybackSession, SessionController, SessionState};
pub use track::{Track, TrackId};
