#![forbid(unsafe_code)]

//! Monotonic clock abstraction.
//!
//! Timing-sensitive logic (tap detection) reads time through [`Clock`] so
//! tests can drive it without real timers.

use std::cell::Cell;
use std::rc::Rc;

use web_time::{Duration, Instant};

/// Source of monotonic time, measured from an arbitrary origin.
pub trait Clock {
    /// Current monotonic time.
    fn now(&self) -> Duration;
}

/// Wall clock backed by [`web_time::Instant`] (works on `wasm32`).
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    /// Create a clock whose origin is "now".
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Host-advanced clock.
///
/// Clones share the same time cell, so a test can keep one handle while the
/// component under test owns another.
#[derive(Debug, Default, Clone)]
pub struct DeterministicClock {
    now: Rc<Cell<Duration>>,
}

impl DeterministicClock {
    /// Create a clock starting at `0`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set current monotonic time.
    pub fn set(&self, now: Duration) {
        self.now.set(now);
    }

    /// Advance monotonic time by `dt`.
    pub fn advance(&self, dt: Duration) {
        self.now.set(self.now.get().saturating_add(dt));
    }
}

impl Clock for DeterministicClock {
    fn now(&self) -> Duration {
        self.now.get()
    }
}
