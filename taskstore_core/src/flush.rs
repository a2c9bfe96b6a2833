use std::time::{Duration, Instant};

pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(2);

/// Tracks when the owner of a store should next call `flush()`.
///
/// The clock is passive: the owning loop asks `is_due` whenever it gets a
/// chance and calls `mark_flushed` after flushing.
#[derive(Debug, Clone)]
pub struct FlushClock {
    interval: Duration,
    last: Instant,
}

impl FlushClock {
    pub fn new(interval: Duration) -> Self {
        Self::starting_at(interval, Instant::now())
    }

    pub fn starting_at(interval: Duration, last: Instant) -> Self {
        Self { interval, last }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_due(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.last) >= self.interval
    }

    pub fn mark_flushed(&mut self, now: Instant) {
        self.last = now;
    }
}

impl Default for FlushClock {
    fn default() -> Self {
        Self::new(DEFAULT_FLUSH_INTERVAL)
    }
}
