//! Time-related operations.
//!
//! Everything comes from `tokio::time`, including `Instant`, so paused test
//! clocks (`tokio::time::pause`) also drive debounce windows.
//!
//! # Examples
//!
//! ```rust
//! use core_async::time::{sleep, timeout, Duration, Instant};
//!
//! async fn example() {
//!     let start = Instant::now();
//!     sleep(Duration::from_millis(5)).await;
//!     assert!(start.elapsed() >= Duration::from_millis(5));
//!
//!     let fast = timeout(Duration::from_secs(1), async { 7 }).await;
//!     assert_eq!(fast.unwrap(), 7);
//! }
//! ```

pub use tokio::time::{interval, sleep, timeout, Instant, Interval};

pub use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Error returned by [`timeout`] when the deadline elapses first.
pub use tokio::time::error::Elapsed as TimeoutError;
