//! Monotonic time source for elapsed-time bookkeeping.

use std::time::Instant;

/// Monotonic seconds since an arbitrary, fixed origin.
///
/// The controller never reads wall-clock time directly, so elapsed time is
/// immune to system clock changes and tests can drive time by hand.
pub trait Clock: Send + Sync {
    /// Seconds elapsed since the clock's origin.
    fn now_seconds(&self) -> f64;
}

/// Clock backed by [`Instant`], with its origin at construction.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    /// Creates a clock whose origin is now.
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
    fn now_seconds(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}
