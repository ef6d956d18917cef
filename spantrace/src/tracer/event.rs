/// A completed span as produced by instrumentation.
///
/// Timestamps are session-relative ticks from [`Tracer::now`](crate::tracer::Tracer::now);
/// the tick frequency is stored in the trace header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
    pub name: &'static str,
    pub time_start: u64,
    pub time_end: u64,
}

impl Event {
    pub const fn new(name: &'static str, time_start: u64, time_end: u64) -> Self {
        Self {
            name,
            time_start,
            time_end,
        }
    }

    /// Length of the name in bytes, as written to the wire.
    pub fn name_size(&self) -> u32 {
        self.name.len() as u32
    }
}

/// Buffer-resident event: the producer's [`Event`] tagged with the
/// session-scoped thread id it was recorded on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InternalEvent {
    pub thread_id: u16,
    pub event: Event,
}

impl InternalEvent {
    pub const fn new(thread_id: u16, event: Event) -> Self {
        Self { thread_id, event }
    }
}

/// Outcome of handing an event to the ingestion buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Append {
    /// Written into the active array.
    Stored,
    /// Buffer was full; counted in `missed_profiles`.
    Dropped,
    /// No session is accepting events. Nothing was counted.
    Closed,
}

impl Append {
    pub fn is_stored(self) -> bool {
        matches!(self, Append::Stored)
    }
}
