//! # Playback Session
//!
//! The session aggregate and the controller that drives it.
//!
//! ## State Machine
//!
//! ```text
//!            play_track             play ok
//!   Idle ──────────────> Loading ──────────────> Playing <──┐
//!    ^                      │                      │  ^     │
//!    │   load/play failed   │            pause     │  │resume
//!    ├──────────────────────┘                      v  │     │
//!    │                                           Paused ────┘
//!    │   cleanup / finished / backend error        │
//!    └─────────────────────────────────────────────┘
//! ```
//!
//! Buffering is tracked as a flag, not a state.

mod debounce;

pub mod controller;
pub mod state;

pub use controller::{PlayOutcome, SessionController};
pub use state::{PlaybackSession, SessionState};
