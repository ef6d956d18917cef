//! Session-scoped dense thread ids.
//!
//! Every thread caches the id it was given together with the generation of
//! the session that handed it out. A generation mismatch means the cache is
//! from an earlier session (or another tracer) and the thread registers again.

use smallvec::SmallVec;
use std::cell::RefCell;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

/// Process-wide generation source, shared by every tracer so that two tracers
/// can never hand out the same tag.
static NEXT_GENERATION: AtomicU64 = AtomicU64::new(1);

thread_local! {
    /// (generation, id) pairs, oldest first. More than one entry only when the
    /// thread records into several tracers whose sessions overlap.
    static THREAD_IDS: RefCell<SmallVec<[(u64, u16); 4]>> = RefCell::new(SmallVec::new());
}

pub(crate) struct ThreadRegistry {
    /// Generation of the current session. 0 before the first session.
    generation: AtomicU64,
    thread_counter: AtomicU32,
}

impl ThreadRegistry {
    pub(crate) fn new() -> Self {
        Self {
            generation: AtomicU64::new(0),
            thread_counter: AtomicU32::new(0),
        }
    }

    /// Start a new generation. Ids handed out before this call become stale.
    pub(crate) fn begin_session(&self) -> u64 {
        self.thread_counter.store(0, Ordering::Relaxed);
        let generation = NEXT_GENERATION.fetch_add(1, Ordering::Relaxed);
        self.generation.store(generation, Ordering::Release);
        generation
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Number of threads registered in the current session.
    pub(crate) fn num_threads(&self) -> u32 {
        self.thread_counter.load(Ordering::Acquire)
    }

    #[cfg(test)]
    pub(crate) fn resolve_thread_id(&self) -> u16 {
        self.resolve().1
    }

    /// The calling thread's id together with the generation it belongs to,
    /// registering the thread on first use in that generation.
    ///
    /// Ids wrap past `u16::MAX` registrations; traces with that many threads
    /// are not supported.
    pub(crate) fn resolve(&self) -> (u64, u16) {
        let generation = self.generation();
        let id = THREAD_IDS
            .try_with(|cell| {
                let mut ids = cell.borrow_mut();
                if let Some(&(_, id)) = ids.iter().find(|(g, _)| *g == generation) {
                    return id;
                }
                let id = self.reserve_id();
                if ids.len() == ids.inline_size() {
                    ids.remove(0);
                }
                ids.push((generation, id));
                id
            })
            // TLS already torn down (thread exit): still hand out a valid id.
            .unwrap_or_else(|_| self.reserve_id());
        (generation, id)
    }

    /// Take the next id without caching it for the calling thread.
    pub(crate) fn reserve_id(&self) -> u16 {
        self.thread_counter.fetch_add(1, Ordering::AcqRel) as u16
    }
}
