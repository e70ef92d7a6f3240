//! Task spawning.
//!
//! `spawn` requires a running Tokio runtime; the session controller spawns its
//! status pump through it, so controllers must be constructed from within a
//! runtime context.
//!
//! # Examples
//!
//! ```rust
//! use core_async::task;
//!
//! async fn example() {
//!     let handle = task::spawn(async { 1 + 1 });
//!     assert_eq!(handle.await.unwrap(), 2);
//! }
//! ```

pub use tokio::task::{yield_now, JoinError, JoinHandle};

/// Spawn a future onto the current runtime.
pub fn spawn<F>(future: F) -> JoinHandle<F::Output>
where
    F: std::future::Future + Send + 'static,
    F::Output: Send + 'static,
{
    tokio::task::spawn(future)
}
