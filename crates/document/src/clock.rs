//! Time source used for latency measurement.
//!
//! The statistics aggregator never reads the system clock directly; it is
//! handed a [`Clock`]. [`ManualClock`] makes latency accounting deterministic
//! in tests.

use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Supplies the current instant.
pub trait Clock: Send + Sync {
    /// Returns the current instant.
    fn now(&self) -> Instant;
}

/// The monotonic system clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that advances by a fixed tick every time it is read.
///
/// The first read returns the start instant, the next one `start + tick`, and
/// so on. A call that reads the clock once when issued and once when completed
/// therefore observes a latency of exactly one tick.
#[derive(Debug)]
pub struct ManualClock {
    next: Mutex<Instant>,
    tick: Duration,
}

impl ManualClock {
    /// Creates a clock starting now and advancing by `tick` per read.
    pub fn new(tick: Duration) -> Self {
        Self::starting_at(Instant::now(), tick)
    }

    /// Creates a clock starting at `start` and advancing by `tick` per read.
    pub fn starting_at(start: Instant, tick: Duration) -> Self {
        Self {
            next: Mutex::new(start),
            tick,
        }
    }

    /// Moves the clock forward without a read.
    pub fn advance(&self, by: Duration) {
        let mut next = self.next.lock().unwrap_or_else(|e| e.into_inner());
        *next += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        let mut next = self.next.lock().unwrap_or_else(|e| e.into_inner());
        let now = *next;
        *next += self.tick;
        now
    }
}
