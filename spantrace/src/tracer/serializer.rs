use crate::tracer::event::InternalEvent;
use crate::tracer::format::{self, Footer, Header};
use crate::tracer::sink::TraceSink;
use std::collections::TryReserveError;
use std::io::Write;

/// Buffered encoder sitting between the writer thread and the sink.
///
/// All record layout lives in [`format`]; this type only decides when bytes
/// reach the sink. Each field goes through one `write` call, and a field that
/// would overflow the output buffer flushes it first, so a record may be split
/// across sink writes but is never reordered.
pub(crate) struct TraceSerializer<S> {
    sink: S,
    buf: Vec<u8>,
    capacity: usize,
    num_syncs: u32,
    num_profiles: u64,
}

impl<S: TraceSink> TraceSerializer<S> {
    pub(crate) fn new(sink: S, capacity: usize) -> Result<Self, TryReserveError> {
        let mut buf = Vec::new();
        buf.try_reserve_exact(capacity)?;
        Ok(Self {
            sink,
            buf,
            capacity,
            num_syncs: 0,
            num_profiles: 0,
        })
    }

    pub(crate) fn write_header(&mut self, header: &Header) -> std::io::Result<()> {
        format::write_header(self, header)
    }

    pub(crate) fn write_event(&mut self, event: &InternalEvent) -> std::io::Result<()> {
        self.num_profiles += 1;
        format::write_event(self, event)
    }

    pub(crate) fn write_events(&mut self, events: &[InternalEvent]) -> std::io::Result<()> {
        for event in events {
            self.write_event(event)?;
        }
        Ok(())
    }

    /// Append the footer using this serializer's own counts. Returns what was
    /// written.
    pub(crate) fn write_footer(
        &mut self,
        num_threads: u16,
        missed_profiles: u64,
    ) -> std::io::Result<Footer> {
        let footer = Footer {
            num_threads,
            num_syncs: self.num_syncs,
            missed_profiles,
            num_profiles: self.num_profiles,
        };
        format::write_footer(self, &footer)?;
        Ok(footer)
    }

    /// Push buffered bytes to the sink.
    pub(crate) fn sync(&mut self) -> std::io::Result<()> {
        if self.buf.is_empty() {
            return Ok(());
        }
        self.num_syncs += 1;
        let result = self.sink.write_all(&self.buf);
        self.buf.clear();
        result
    }

    /// Flush everything and close the sink.
    pub(crate) fn finish(mut self) -> std::io::Result<S> {
        self.sync()?;
        self.sink.close()?;
        Ok(self.sink)
    }

    #[cfg(test)]
    fn num_syncs(&self) -> u32 {
        self.num_syncs
    }

    #[cfg(test)]
    fn num_profiles(&self) -> u64 {
        self.num_profiles
    }

    #[cfg(test)]
    fn buffered(&self) -> usize {
        self.buf.len()
    }
}

impl<S: TraceSink> Write for TraceSerializer<S> {
    fn write(&mut self, bytes: &[u8]) -> std::io::Result<usize> {
        if self.buf.len() + bytes.len() > self.capacity {
            self.sync()?;
        }
        if bytes.len() > self.capacity {
            // Larger than the whole output buffer: bypass it.
            self.num_syncs += 1;
            self.sink.write_all(bytes)?;
        } else {
            self.buf.extend_from_slice(bytes);
        }
        Ok(bytes.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.sync()
    }
}
