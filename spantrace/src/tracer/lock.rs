//! Writer-priority spin lock guarding the active event array.
//!
//! Producers and the single writer contend for one lock bit. Before the writer
//! starts spinning it raises `want_priority`; producers that have not yet
//! acquired the lock wait for the flag to drop before they even try, so the
//! writer only ever waits behind producers that were already inside. The
//! critical sections on both sides are a handful of stores, so waiters spin
//! briefly and then yield instead of parking. The lock bit itself is a
//! `spinning_top` spinlock.

use spinning_top::{Spinlock, guard::SpinlockGuard};
use std::hint;
use std::sync::atomic::{AtomicBool, Ordering};

const SPIN_LIMIT: u32 = 6;

pub(crate) type PriorityGuard<'a, T> = SpinlockGuard<'a, T>;

pub(crate) struct PriorityLock<T> {
    want_priority: AtomicBool,
    inner: Spinlock<T>,
}

impl<T> PriorityLock<T> {
    pub(crate) fn new(value: T) -> Self {
        Self {
            want_priority: AtomicBool::new(false),
            inner: Spinlock::new(value),
        }
    }

    /// Producer-side acquire. Yields to a pending priority request.
    pub(crate) fn lock(&self) -> PriorityGuard<'_, T> {
        let mut backoff = Backoff::default();
        loop {
            if !self.want_priority.load(Ordering::Acquire)
                && let Some(guard) = self.inner.try_lock()
            {
                return guard;
            }
            backoff.snooze();
        }
    }

    /// Writer-side acquire. Only one thread may use this at a time.
    pub(crate) fn lock_priority(&self) -> PriorityGuard<'_, T> {
        let already_pending = self.want_priority.swap(true, Ordering::AcqRel);
        debug_assert!(!already_pending, "concurrent priority lockers");
        let mut backoff = Backoff::default();
        loop {
            if let Some(guard) = self.inner.try_lock() {
                self.want_priority.store(false, Ordering::Release);
                return guard;
            }
            backoff.snooze();
        }
    }

    #[cfg(test)]
    fn is_priority_pending(&self) -> bool {
        self.want_priority.load(Ordering::Acquire)
    }
}

/// Exponential spin, then yield to the scheduler.
#[derive(Default)]
struct Backoff {
    step: u32,
}

impl Backoff {
    fn snooze(&mut self) {
        if self.step <= SPIN_LIMIT {
            for _ in 0..1 << self.step {
                hint::spin_loop();
            }
            self.step += 1;
        } else {
            std::thread::yield_now();
        }
    }
}
