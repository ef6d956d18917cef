//! The background writer thread.
//!
//! One per session. Owns the standby array, the serializer and the sink;
//! nothing else in the process touches them.

use super::SessionContext;
use super::state::SessionState;
use crate::tracer::buffer::event_array;
use crate::tracer::config::TracerConfig;
use crate::tracer::event::{Event, InternalEvent};
use crate::tracer::format::{Footer, Header};
use crate::tracer::serializer::TraceSerializer;
use crate::tracer::sink::TraceSink;
use std::collections::TryReserveError;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

pub(crate) const FLUSH_EVENT_NAME: &str = "Flush Trace Buffer";

pub(super) struct TraceWriter {
    shared: Arc<SessionContext>,
    serializer: TraceSerializer<Box<dyn TraceSink>>,
    standby: Vec<InternalEvent>,
    swap_threshold: usize,
    poll_interval: Duration,
    /// The writer's own thread id when flushes are instrumented.
    flush_thread_id: Option<u16>,
}

impl TraceWriter {
    /// Allocates the standby array and output buffer up front, so a session
    /// that cannot get its memory fails before it starts.
    pub(super) fn new(
        shared: Arc<SessionContext>,
        config: &TracerConfig,
        sink: Box<dyn TraceSink>,
    ) -> Result<Self, TryReserveError> {
        Ok(Self {
            shared,
            serializer: TraceSerializer::new(sink, config.output_buffer_size)?,
            standby: event_array(config.buffer_capacity)?,
            swap_threshold: config.swap_threshold,
            poll_interval: config.poll_interval,
            flush_thread_id: None,
        })
    }

    /// Emit flush markers under `thread_id`, reserved before the session
    /// started running.
    pub(super) fn instrument_flushes(&mut self, thread_id: u16) {
        self.flush_thread_id = Some(thread_id);
    }

    /// Thread body. Always leaves the session `NotRunning`, even on error, so
    /// the tracer can start another session.
    pub(super) fn run(self, header: Header) -> std::io::Result<Footer> {
        let shared = self.shared.clone();
        let result = self.write_session(header);
        if let Err(e) = &result {
            error!(error = %e, "trace writer failed; closing session");
            shared.buffer.seal_and_take(&mut Vec::new());
            shared.state.store(SessionState::NotRunning);
        }
        result
    }

    fn write_session(mut self, header: Header) -> std::io::Result<Footer> {
        self.serializer.write_header(&header)?;
        debug!(
            frequency = header.performance_frequency,
            trace_id = self.shared.registry.generation(),
            "trace writer started"
        );

        loop {
            // Covers a shutdown requested before the first cycle too.
            if self.shared.state.load() == SessionState::Ending {
                return self.finish();
            }
            if self.has_new_events() {
                self.swap_and_drain()?;
            } else {
                // end_session unparks us, so a long interval does not delay shutdown.
                std::thread::park_timeout(self.poll_interval);
            }
        }
    }

    /// Lock-free trigger. Counts producer appends only, so a carried flush
    /// marker alone never causes a swap.
    fn has_new_events(&self) -> bool {
        self.shared.buffer.should_swap(self.swap_threshold)
    }

    fn swap_and_drain(&mut self) -> std::io::Result<()> {
        let flush_start = self.shared.now();
        let drained = self.shared.buffer.swap(&mut self.standby);
        self.serializer.write_events(&self.standby)?;
        self.standby.clear();
        debug!(drained, "swapped event buffers");

        if let Some(thread_id) = self.flush_thread_id {
            let marker = Event::new(FLUSH_EVENT_NAME, flush_start, self.shared.now());
            self.standby.push(InternalEvent::new(thread_id, marker));
        }
        Ok(())
    }

    fn finish(mut self) -> std::io::Result<Footer> {
        // Any carried flush marker predates what is still in the active array.
        let mut remaining = std::mem::take(&mut self.standby);
        self.shared.buffer.seal_and_take(&mut remaining);
        self.serializer.write_events(&remaining)?;

        let num_threads = u16::try_from(self.shared.registry.num_threads()).unwrap_or(u16::MAX);
        let missed = self.shared.buffer.missed();
        let footer = self.serializer.write_footer(num_threads, missed)?;

        self.serializer.finish()?;

        if missed > 0 {
            warn!(
                missed,
                capacity = self.shared.buffer.capacity(),
                "trace buffer overflowed; events were dropped"
            );
        }
        debug!(
            num_profiles = footer.num_profiles,
            num_syncs = footer.num_syncs,
            num_threads = footer.num_threads,
            "trace session finished"
        );
        self.shared.state.store(SessionState::NotRunning);
        Ok(footer)
    }
}
