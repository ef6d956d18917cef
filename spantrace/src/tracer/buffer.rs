use crate::tracer::event::{Append, InternalEvent};
use crate::tracer::lock::PriorityLock;
use std::collections::TryReserveError;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

/// Allocate an event array for a buffer of `capacity`, with one extra slot
/// for a carried flush marker.
pub(crate) fn event_array(capacity: usize) -> Result<Vec<InternalEvent>, TryReserveError> {
    let mut events = Vec::new();
    events.try_reserve_exact(capacity.saturating_add(1))?;
    Ok(events)
}

/// Double-buffered event store.
///
/// The active array lives behind the [`PriorityLock`]; the standby array is
/// owned by the writer thread and handed in on every [`swap`](Self::swap), so
/// the two are never reachable from more than one thread at a time.
///
/// `top` counts append attempts since the last swap, including ones that were
/// dropped, so it can exceed `capacity`. Entries carried in by a swap (the
/// writer's flush marker) are not counted and never take a producer's slot.
pub(crate) struct EventBuffer {
    active: PriorityLock<Vec<InternalEvent>>,
    top: AtomicUsize,
    capacity: AtomicUsize,
    missed: AtomicU64,
    sealed: AtomicBool,
    /// Registry generation of the session currently accepting events.
    generation: AtomicU64,
}

impl EventBuffer {
    pub(crate) fn new() -> Self {
        Self {
            active: PriorityLock::new(Vec::new()),
            top: AtomicUsize::new(0),
            capacity: AtomicUsize::new(0),
            missed: AtomicU64::new(0),
            sealed: AtomicBool::new(true),
            generation: AtomicU64::new(0),
        }
    }

    /// Prepare for a new session: empty, unsealed, counters cleared. Only
    /// events tagged with `generation` are accepted afterwards.
    ///
    /// On allocation failure nothing changes and the buffer stays sealed.
    pub(crate) fn reset(&self, capacity: usize, generation: u64) -> Result<(), TryReserveError> {
        let fresh = event_array(capacity)?;
        let mut active = self.active.lock_priority();
        *active = fresh;
        self.capacity.store(capacity, Ordering::Relaxed);
        self.top.store(0, Ordering::Relaxed);
        self.missed.store(0, Ordering::Relaxed);
        self.generation.store(generation, Ordering::Relaxed);
        self.sealed.store(false, Ordering::Release);
        Ok(())
    }

    /// Store `event`, which the caller tagged with a thread id from registry
    /// `generation`. Ids from an earlier session are refused as `Closed`.
    pub(crate) fn append(&self, generation: u64, event: InternalEvent) -> Append {
        let mut active = self.active.lock();
        if self.sealed.load(Ordering::Acquire)
            || self.generation.load(Ordering::Relaxed) != generation
        {
            return Append::Closed;
        }
        let top = self.top.fetch_add(1, Ordering::AcqRel) + 1;
        if top > self.capacity.load(Ordering::Relaxed) {
            self.missed.fetch_add(1, Ordering::Relaxed);
            return Append::Dropped;
        }
        active.push(event);
        Append::Stored
    }

    /// Unsynchronized read of the append count. Only a hint for when to swap;
    /// the swap itself re-reads everything under the lock.
    pub(crate) fn approx_len(&self) -> usize {
        self.top.load(Ordering::Relaxed)
    }

    pub(crate) fn should_swap(&self, threshold: usize) -> bool {
        let top = self.approx_len();
        top > 0 && (top > threshold || top >= self.capacity.load(Ordering::Relaxed))
    }

    /// Exchange the active array with `standby`.
    ///
    /// On return `standby` holds every event appended before the swap. Events
    /// already sitting in the incoming array (a carried-over flush marker) stay
    /// in it ahead of the next appends, outside the producer count.
    pub(crate) fn swap(&self, standby: &mut Vec<InternalEvent>) -> usize {
        let mut active = self.active.lock_priority();
        std::mem::swap(&mut *active, standby);
        self.top.store(0, Ordering::Release);
        standby.len()
    }

    /// Final drain: refuse further appends and move what is left into `out`.
    pub(crate) fn seal_and_take(&self, out: &mut Vec<InternalEvent>) {
        let mut active = self.active.lock_priority();
        self.sealed.store(true, Ordering::Release);
        out.append(&mut active);
        self.top.store(0, Ordering::Release);
    }

    #[cfg(test)]
    pub(crate) fn is_sealed(&self) -> bool {
        self.sealed.load(Ordering::Acquire)
    }

    pub(crate) fn missed(&self) -> u64 {
        self.missed.load(Ordering::Acquire)
    }

    pub(crate) fn capacity(&self) -> usize {
        self.capacity.load(Ordering::Relaxed)
    }
}
