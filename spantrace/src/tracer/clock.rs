//! Tick sources for span timestamps.
//!
//! A [`Clock`] exposes a raw monotonic counter plus its frequency. [`Timer`]
//! rebases that counter to the start of the current session.

use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

pub const NANOS_PER_SEC: u64 = 1_000_000_000;

pub trait Clock: Send + Sync {
    /// Raw counter value. Must never decrease.
    fn now_ticks(&self) -> u64;
    /// Counter ticks per second.
    fn frequency(&self) -> u64;
}

/// Nanoseconds since a process-wide [`Instant`] epoch.
#[derive(Debug, Default, Clone, Copy)]
pub struct MonotonicClock;

fn epoch() -> Instant {
    static EPOCH: OnceLock<Instant> = OnceLock::new();
    *EPOCH.get_or_init(Instant::now)
}

impl Clock for MonotonicClock {
    fn now_ticks(&self) -> u64 {
        epoch().elapsed().as_nanos() as u64
    }

    fn frequency(&self) -> u64 {
        NANOS_PER_SEC
    }
}

/// Clock whose counter only moves when told to. Useful for deterministic tests.
#[derive(Debug)]
pub struct ManualClock {
    ticks: AtomicU64,
    frequency: u64,
}

impl ManualClock {
    pub fn new(frequency: u64) -> Self {
        Self {
            ticks: AtomicU64::new(0),
            frequency,
        }
    }

    pub fn set(&self, ticks: u64) {
        self.ticks.store(ticks, Ordering::Relaxed);
    }

    pub fn advance(&self, ticks: u64) -> u64 {
        self.ticks.fetch_add(ticks, Ordering::Relaxed) + ticks
    }
}

impl Clock for ManualClock {
    fn now_ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    fn frequency(&self) -> u64 {
        self.frequency
    }
}

/// Session-relative view of a clock.
pub(crate) struct Timer {
    baseline: AtomicU64,
}

impl Timer {
    pub(crate) fn new() -> Self {
        Self {
            baseline: AtomicU64::new(0),
        }
    }

    /// Capture the baseline for a new session. Returns the clock frequency
    /// that goes into the trace header.
    pub(crate) fn start(&self, clock: &dyn Clock) -> u64 {
        self.baseline.store(clock.now_ticks(), Ordering::Release);
        clock.frequency()
    }

    pub(crate) fn get_time(&self, clock: &dyn Clock) -> u64 {
        clock
            .now_ticks()
            .saturating_sub(self.baseline.load(Ordering::Acquire))
    }
}
