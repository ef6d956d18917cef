use crate::tracer::event::{Append, Event};
use crate::tracer::session::Tracer;

/// Times a lexical scope and records it as one span when dropped.
///
/// Created by [`Tracer::span`] or the [`trace_scope!`](crate::trace_scope)
/// macro. The start time is read on creation, the end time on drop.
#[must_use = "the span is recorded when the guard is dropped"]
pub struct ScopeGuard<'a> {
    tracer: &'a Tracer,
    name: &'static str,
    start: u64,
    done: bool,
}

impl<'a> ScopeGuard<'a> {
    pub(crate) fn new(tracer: &'a Tracer, name: &'static str) -> Self {
        Self {
            tracer,
            name,
            start: tracer.now(),
            done: false,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn start(&self) -> u64 {
        self.start
    }

    /// Close the span now and report what happened to it.
    pub fn finish(mut self) -> Append {
        self.record()
    }

    fn record(&mut self) -> Append {
        self.done = true;
        let end = self.tracer.now();
        self.tracer.record(Event::new(self.name, self.start, end))
    }
}

impl Drop for ScopeGuard<'_> {
    fn drop(&mut self) {
        if !self.done {
            self.record();
        }
    }
}
