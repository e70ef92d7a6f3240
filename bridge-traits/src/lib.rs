//! # Host Bridge Traits
//!
//! Capabilities the playback core needs from its host platform.
//!
//! ## Overview
//!
//! The core never touches a speaker, a socket or a file directly. Each host
//! (desktop shell, iOS, Android, browser) supplies implementations of the
//! traits below and the core adapts them.
//!
//! ## Traits
//!
//! ### Playback primitives
//! - [`MediaElement`](playback::MediaElement) - Browser-style streaming element
//! - [`NativeAudioEngine`](playback::NativeAudioEngine) - Native engine playing local files
//!
//! ### Storage & transfer
//! - [`FileSystemAccess`](storage::FileSystemAccess) - Private app directories
//! - [`MediaDownloader`](download::MediaDownloader) - Resumable media transfer with progress
//!
//! ### Diagnostics
//! - [`LoggerSink`](logger::LoggerSink) - Forward structured logs to host logging
//!
//! ## Platform Requirements
//!
//! | Platform | Playback primitive | Download cache |
//! |----------|--------------------|----------------|
//! | Web      | `MediaElement`     | remote-only    |
//! | Native   | `NativeAudioEngine`| `FileSystemAccess` + `MediaDownloader` |
//!
//! The core fails fast with `CapabilityMissing` when the selected platform
//! lacks one of its required capabilities.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync`. Listener callbacks handed to the
//! primitives may be invoked from host threads and must not block.

pub mod download;
pub mod error;
pub mod logger;
pub mod playback;
pub mod storage;

pub use error::BridgeError;

pub use download::{DownloadRequest, DownloadedFile, MediaDownloader, ProgressCallback, TransferProgress};
pub use logger::{ConsoleLogger, LogEntry, LogLevel, LoggerSink};
pub use playback::{
    AudioSessionConfig, ElementId, InterruptionMode, ListenerToken, MediaElement,
    MediaElementEvent, MediaElementListener, NativeAudioEngine, SoundId, SoundStatus,
    SoundStatusListener,
};
pub use storage::{FileMetadata, FileSystemAccess};
