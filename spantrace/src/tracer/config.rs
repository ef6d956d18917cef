use crate::tracer::clock::{Clock, MonotonicClock};
use crate::tracer::error::{Result, TraceError};
use crate::tracer::format::FOOTER_SIZE;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_BUFFER_CAPACITY: usize = 2048;
pub const DEFAULT_OUTPUT_BUFFER_SIZE: usize = 16 * 1024;
pub const DEFAULT_SWAP_THRESHOLD: usize = 20;
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_micros(500);

/// Per-session tuning. Read when a session begins, so a changed config only
/// affects later sessions.
#[derive(Clone)]
pub struct TracerConfig {
    /// Events held by each of the two arrays.
    pub buffer_capacity: usize,
    /// Size of the serializer's output buffer in bytes.
    pub output_buffer_size: usize,
    /// Swap once more than this many events are pending.
    pub swap_threshold: usize,
    /// How long the writer sleeps when there is nothing to swap.
    pub poll_interval: Duration,
    /// Emit a "Flush Trace Buffer" span for every swap, timed by the writer.
    pub instrument_flushes: bool,
    pub clock: Arc<dyn Clock>,
}

impl Default for TracerConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            output_buffer_size: DEFAULT_OUTPUT_BUFFER_SIZE,
            swap_threshold: DEFAULT_SWAP_THRESHOLD,
            poll_interval: DEFAULT_POLL_INTERVAL,
            instrument_flushes: false,
            clock: Arc::new(MonotonicClock),
        }
    }
}

impl fmt::Debug for TracerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TracerConfig")
            .field("buffer_capacity", &self.buffer_capacity)
            .field("output_buffer_size", &self.output_buffer_size)
            .field("swap_threshold", &self.swap_threshold)
            .field("poll_interval", &self.poll_interval)
            .field("instrument_flushes", &self.instrument_flushes)
            .field("clock_frequency", &self.clock.frequency())
            .finish()
    }
}

impl TracerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.buffer_capacity == 0 {
            return Err(TraceError::InvalidConfig("buffer_capacity must be at least 1"));
        }
        if self.output_buffer_size < FOOTER_SIZE {
            return Err(TraceError::InvalidConfig(
                "output_buffer_size must hold at least one footer",
            ));
        }
        if self.clock.frequency() == 0 {
            return Err(TraceError::InvalidConfig("clock frequency must be non-zero"));
        }
        Ok(())
    }
}

/// Builder for [`Tracer`](crate::tracer::Tracer).
#[derive(Debug, Default)]
pub struct TracerBuilder {
    config: TracerConfig,
}

impl TracerBuilder {
    pub fn with_buffer_capacity(mut self, capacity: usize) -> Self {
        self.config.buffer_capacity = capacity;
        self
    }

    pub fn with_output_buffer_size(mut self, bytes: usize) -> Self {
        self.config.output_buffer_size = bytes;
        self
    }

    pub fn with_swap_threshold(mut self, events: usize) -> Self {
        self.config.swap_threshold = events;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.config.poll_interval = interval;
        self
    }

    pub fn with_flush_instrumentation(mut self, enabled: bool) -> Self {
        self.config.instrument_flushes = enabled;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.config.clock = clock;
        self
    }

    pub fn config(&self) -> &TracerConfig {
        &self.config
    }

    pub fn build(self) -> Result<crate::tracer::Tracer> {
        self.config.validate()?;
        Ok(crate::tracer::Tracer::with_config(self.config))
    }
}
