//! Workspace façade crate.
//!
//! Re-exports the player service so host applications can depend on
//! `pocket-player` alone and pick bridges through its feature flags
//! (`desktop-shims` is on by default).

pub use core_service::*;
