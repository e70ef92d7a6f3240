//! Async runtime surface for the player core.
//!
//! Every `core-*` and `bridge-*` crate takes its async primitives from here
//! instead of reaching into Tokio directly, so the executor choice stays in
//! one place.
//!
//! # Modules
//!
//! - `task`: task spawning and join handles
//! - `time`: sleep, timeout and instants
//! - `sync`: locks, channels and the `watch` primitive used for session snapshots
//! - `runtime`: the ambient executor handle and a blocking bridge
//! - `future`: combinators re-exported from `futures`, notably `Shared` which
//!   the download cache uses to coalesce fetches
//!
//! # Examples
//!
//! ```rust
//! use core_async::task;
//! use core_async::time::{sleep, Duration};
//!
//! async fn example() {
//!     let handle = task::spawn(async {
//!         sleep(Duration::from_millis(10)).await;
//!         42
//!     });
//!     assert_eq!(handle.await.unwrap(), 42);
//! }
//! ```

pub mod sync;
pub mod task;
pub mod time;

pub mod runtime {
    //! Access to the ambient executor.
    pub use futures::executor::block_on;
    pub use tokio::runtime::Handle;
}

pub mod future {
    //! Future combinators used across the workspace.
    pub use futures::future::{BoxFuture, FutureExt, Shared};
}

pub use task::spawn;
pub use time::{sleep, Duration, Instant};
