//! Blackout gate: time-based suppression of trigger notifications.
//!
//! One monotonic deadline. A successful trigger send extends the deadline
//! to `now + window`, unconditionally overwriting any pending deadline —
//! windows never stack. Raw forwards never consult or mutate the gate.

use std::time::Duration;

use tokio::time::Instant;

/// A single-deadline suppression gate.
///
/// Owned by the watcher loop; `now` is passed in by the caller so tests
/// can drive the clock deterministically.
#[derive(Debug, Clone, Copy)]
pub struct BlackoutGate {
    next_allowed: Instant,
}

impl BlackoutGate {
    /// Create an open gate (the deadline is already in the past).
    pub fn new() -> Self {
        Self {
            next_allowed: Instant::now(),
        }
    }

    /// Whether trigger dispatch is allowed at `now`.
    pub fn is_open_at(&self, now: Instant) -> bool {
        now >= self.next_allowed
    }

    /// Close the gate until `now + window`, overwriting any prior deadline.
    pub fn extend(&mut self, now: Instant, window: Duration) {
        self.next_allowed = now.checked_add(window).unwrap_or(now);
    }

    /// The instant at which the gate next opens.
    pub fn next_allowed(&self) -> Instant {
        self.next_allowed
    }
}

impl Default for BlackoutGate {
    fn default() -> Self {
        Self::new()
    }
}
