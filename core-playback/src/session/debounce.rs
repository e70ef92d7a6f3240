//! Leading-edge debounce with a generation token.

use core_async::time::{Duration, Instant};

/// Admits the first call of a burst and drops the rest.
///
/// A dropped call still extends the window. Every admitted call gets a new
/// generation; only the latest generation may apply its result.
#[derive(Debug)]
pub(crate) struct Debouncer {
    window: Duration,
    last_call: Option<Instant>,
    generation: u64,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_call: None,
            generation: 0,
        }
    }

    /// `Some(generation)` if the call at `now` should run.
    pub fn admit(&mut self, now: Instant) -> Option<u64> {
        let within_window = self
            .last_call
            .map(|last| now.saturating_duration_since(last) < self.window)
            .unwrap_or(false);
        self.last_call = Some(now);

        if within_window {
            None
        } else {
            self.generation += 1;
            Some(self.generation)
        }
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.generation == generation
    }

    /// Outstanding generations can no longer apply their result.
    pub fn invalidate(&mut self) {
        self.generation += 1;
    }

    /// Invalidate and reopen the window.
    pub fn reset(&mut self) {
        self.invalidate();
        self.last_call = None;
    }
}
