//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux).
//!
//! - `FileSystemAccess` using `tokio::fs` and platform directories from `dirs`
//! - `MediaDownloader` using `reqwest` streaming with HTTP range resume
//!
//! Desktop has no playback primitive here; the host shell injects its own
//! `MediaElement` or `NativeAudioEngine`.
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{ReqwestMediaDownloader, TokioFileSystem};
//! use std::sync::Arc;
//!
//! let config = CoreConfig::builder()
//!     .platform(Platform::Native)
//!     .file_system(Arc::new(TokioFileSystem::new()))
//!     .media_downloader(Arc::new(ReqwestMediaDownloader::new()))
//!     .audio_engine(engine)
//!     .build()?;
//! ```

mod download;
mod filesystem;

pub use download::ReqwestMediaDownloader;
pub use filesystem::TokioFileSystem;
