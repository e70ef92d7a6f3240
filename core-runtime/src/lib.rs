//! # Core Runtime Module
//!
//! Runtime infrastructure shared by the player crates:
//! - Logging and tracing setup
//! - Configuration with fail-fast capability checks
//! - The event bus carrying playback and download events

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
