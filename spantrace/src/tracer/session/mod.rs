mod state;
mod writer;

pub use state::SessionState;

use crate::tracer::buffer::EventBuffer;
use crate::tracer::clock::{Clock, Timer};
use crate::tracer::config::{TracerBuilder, TracerConfig};
use crate::tracer::error::{Result, TraceError};
use crate::tracer::event::{Append, Event, InternalEvent};
use crate::tracer::format::{Footer, Header};
use crate::tracer::registry::ThreadRegistry;
use crate::tracer::scope::ScopeGuard;
use crate::tracer::sink::{FileSink, TraceSink};
use state::StateCell;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use tracing::debug;
use writer::TraceWriter;

/// Footer values of a finished session, as written to the trace file.
pub type TraceSummary = Footer;

/// State shared between producers and the writer thread. Accessed lock-free
/// on the hot path, except for the active array inside [`EventBuffer`].
pub(crate) struct SessionContext {
    pub(crate) state: StateCell,
    pub(crate) registry: ThreadRegistry,
    pub(crate) buffer: EventBuffer,
    timer: Timer,
    clock: Arc<dyn Clock>,
}

impl SessionContext {
    fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: StateCell::new(),
            registry: ThreadRegistry::new(),
            buffer: EventBuffer::new(),
            timer: Timer::new(),
            clock,
        }
    }

    pub(crate) fn now(&self) -> u64 {
        self.timer.get_time(&*self.clock)
    }
}

type WriterSlot = Option<JoinHandle<std::io::Result<Footer>>>;

/// An in-process span tracer.
///
/// A `Tracer` is reusable: call [`begin_session`](Self::begin_session) and
/// [`end_session`](Self::end_session) as often as needed. Each session writes
/// one trace file through its own background writer thread.
pub struct Tracer {
    shared: Arc<SessionContext>,
    config: TracerConfig,
    /// Join handle of the running session's writer. Held while starting and
    /// stopping so the two never interleave.
    writer: Mutex<WriterSlot>,
}

impl Default for Tracer {
    fn default() -> Self {
        Self::new()
    }
}

impl Tracer {
    pub fn new() -> Self {
        Self::with_config(TracerConfig::default())
    }

    pub fn builder() -> TracerBuilder {
        TracerBuilder::default()
    }

    pub(crate) fn with_config(config: TracerConfig) -> Self {
        Self {
            shared: Arc::new(SessionContext::new(config.clock.clone())),
            config,
            writer: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &TracerConfig {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        self.shared.state.load()
    }

    pub fn is_running(&self) -> bool {
        self.state() == SessionState::Running
    }

    /// Tag of the current (or last) session. Changes on every `begin_session`.
    pub fn trace_id(&self) -> u64 {
        self.shared.registry.generation()
    }

    /// Ticks since the current session started.
    pub fn now(&self) -> u64 {
        self.shared.now()
    }

    /// Start a session writing to `path`, which is created or truncated.
    pub fn begin_session(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut slot = self.lock_writer()?;
        let sink = FileSink::create(path.as_ref())?;
        self.start(&mut slot, Box::new(sink))
    }

    /// Start a session writing to an arbitrary sink.
    pub fn begin_session_with_sink(&self, sink: Box<dyn TraceSink>) -> Result<()> {
        let mut slot = self.lock_writer()?;
        self.start(&mut slot, sink)
    }

    /// Stop the running session and wait for the writer to finish its final
    /// drain. Returns the footer that was written.
    pub fn end_session(&self) -> Result<TraceSummary> {
        let mut slot = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(handle) = slot.take() else {
            return Err(TraceError::NotRunning);
        };
        // If the writer already gave up on an I/O error the state is back to
        // NotRunning; the join below reports that error.
        let _ = self
            .shared
            .state
            .transition(SessionState::Running, SessionState::Ending);

        handle.thread().unpark();

        match handle.join() {
            Ok(result) => Ok(result?),
            Err(_) => {
                self.shared.buffer.seal_and_take(&mut Vec::new());
                self.shared.state.store(SessionState::NotRunning);
                Err(TraceError::WriterPanicked)
            }
        }
    }

    /// Hand a finished span to the running session.
    ///
    /// Never blocks on I/O. Returns [`Append::Dropped`] when the buffer is
    /// full and [`Append::Closed`] when no session is running.
    pub fn record(&self, event: Event) -> Append {
        if self.shared.state.load() != SessionState::Running {
            return Append::Closed;
        }
        let (generation, thread_id) = self.shared.registry.resolve();
        self.shared
            .buffer
            .append(generation, InternalEvent::new(thread_id, event))
    }

    /// Open a span that is recorded when the returned guard drops.
    pub fn span(&self, name: &'static str) -> ScopeGuard<'_> {
        ScopeGuard::new(self, name)
    }

    fn lock_writer(&self) -> Result<MutexGuard<'_, WriterSlot>> {
        let slot = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_some() || self.state() != SessionState::NotRunning {
            return Err(TraceError::AlreadyRunning);
        }
        Ok(slot)
    }

    /// Reset the shared state for a new session and spawn its writer.
    fn start(&self, slot: &mut WriterSlot, sink: Box<dyn TraceSink>) -> Result<()> {
        let shared = &self.shared;
        let mut writer = TraceWriter::new(shared.clone(), &self.config, sink)?;

        // New generation before the buffer opens, so producers still holding
        // an id from the previous session are refused.
        let trace_id = shared.registry.begin_session();
        if self.config.instrument_flushes {
            writer.instrument_flushes(shared.registry.reserve_id());
        }
        shared.buffer.reset(self.config.buffer_capacity, trace_id)?;
        let frequency = shared.timer.start(&*shared.clock);
        shared.state.store(SessionState::Running);

        let header = Header::new(frequency);
        let spawned = std::thread::Builder::new()
            .name("spantrace-writer".into())
            .spawn(move || writer.run(header));

        match spawned {
            Ok(handle) => {
                *slot = Some(handle);
                debug!(
                    trace_id,
                    capacity = self.config.buffer_capacity,
                    "trace session started"
                );
                Ok(())
            }
            Err(e) => {
                shared.buffer.seal_and_take(&mut Vec::new());
                shared.state.store(SessionState::NotRunning);
                Err(TraceError::Spawn(e))
            }
        }
    }
}

impl Drop for Tracer {
    fn drop(&mut self) {
        if self.writer.get_mut().map(|slot| slot.is_some()).unwrap_or(false) {
            let _ = self.end_session();
        }
    }
}
