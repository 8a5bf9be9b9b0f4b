//! Update-cycle timing

use std::time::Duration;

/// Accumulating throttle that fires at most once per interval.
///
/// Callers feed it the frame delta every frame; it reports `true` on the frame
/// where the accumulated time reaches the interval and then starts over.
#[derive(Clone, Debug)]
pub struct UpdateTimer {
    interval: Duration,
    elapsed: Duration,
    fired: u64,
}

impl UpdateTimer {
    /// Create a timer with the given interval
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            elapsed: Duration::ZERO,
            fired: 0,
        }
    }

    /// Advance by one frame. Returns true when an update cycle is due.
    pub fn tick(&mut self, delta: Duration) -> bool {
        self.elapsed += delta;
        if self.elapsed < self.interval {
            return false;
        }
        self.elapsed = Duration::ZERO;
        self.fired += 1;
        true
    }

    /// Interval between update cycles
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Time accumulated since the last cycle
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Number of cycles fired so far
    pub fn fired_count(&self) -> u64 {
        self.fired
    }

    /// Forget accumulated time
    pub fn reset(&mut self) {
        self.elapsed = Duration::ZERO;
    }
}
