//! Synchronization primitives.
//!
//! Re-exports the async-aware `tokio::sync` types. These never block the
//! executor and are `Send + Sync`, so they can be shared freely between the
//! session controller, its status pump and the download cache.
//!
//! # Examples
//!
//! ```rust
//! use core_async::sync::{watch, Mutex};
//!
//! async fn example() {
//!     let mutex = Mutex::new(42);
//!     *mutex.lock().await += 1;
//!
//!     let (tx, rx) = watch::channel(0u32);
//!     tx.send(1).ok();
//!     assert_eq!(*rx.borrow(), 1);
//! }
//! ```

pub use tokio::sync::{
    broadcast, mpsc, oneshot, watch, Mutex, MutexGuard, Notify, OnceCell, RwLock, Semaphore,
    SemaphorePermit,
};
