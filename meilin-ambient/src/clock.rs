//! Time sources for the selector.
//!
//! Selection logic never reads the system clock itself. Callers pass a
//! [`Timestamp`] explicitly, or hand a [`Clock`] to a higher-level engine.

use crate::types::Timestamp;
use chrono::Timelike;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::{Duration, Instant};

pub trait Clock {
    /// Current point on a non-decreasing timeline.
    fn now(&self) -> Timestamp;

    /// Current local wall-clock hour (`0..24`), used for time-of-day matching.
    fn local_hour(&self) -> u32;
}

/// Monotonic clock anchored at construction, with local hour from the OS.
#[derive(Debug, Clone)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
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
    fn now(&self) -> Timestamp {
        let millis = u64::try_from(self.origin.elapsed().as_millis()).unwrap_or(u64::MAX);
        Timestamp::from_millis(millis)
    }

    fn local_hour(&self) -> u32 {
        chrono::Local::now().hour()
    }
}

/// Hand-driven clock for tests and simulations.
///
/// Clones share the same underlying time, so a test can keep one handle
/// and advance it after moving another into an engine.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    millis: Arc<AtomicU64>,
    hour: Arc<AtomicU32>,
}

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        let clock = Self::default();
        clock.set(start);
        clock
    }

    pub fn set(&self, at: Timestamp) {
        self.millis.store(at.as_millis(), Ordering::SeqCst);
    }

    pub fn advance(&self, by: Duration) {
        let next = self.now() + by;
        self.set(next);
    }

    /// Set the reported local hour; values wrap modulo 24.
    pub fn set_hour(&self, hour: u32) {
        self.hour.store(hour % 24, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        Timestamp::from_millis(self.millis.load(Ordering::SeqCst))
    }

    fn local_hour(&self) -> u32 {
        self.hour.load(Ordering::SeqCst)
    }
}
