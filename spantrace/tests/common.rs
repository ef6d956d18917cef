use spantrace::tracer::{MemorySink, TraceFile, TraceReader, TraceSink, Tracer};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Returns true when running in CI (GitHub Actions sets CI=true).
#[allow(dead_code)]
pub fn is_ci() -> bool {
    std::env::var("CI").is_ok()
}

/// A tracer whose writer polls fast, so swaps happen during the test.
#[allow(dead_code)]
pub fn fast_tracer(capacity: usize, swap_threshold: usize) -> Tracer {
    Tracer::builder()
        .with_buffer_capacity(capacity)
        .with_swap_threshold(swap_threshold)
        .with_poll_interval(Duration::from_micros(50))
        .build()
        .unwrap()
}

/// Start a session on `tracer` that captures into memory.
pub fn begin_in_memory(tracer: &Tracer) -> Arc<Mutex<Vec<u8>>> {
    let (sink, bytes) = MemorySink::new();
    tracer.begin_session_with_sink(Box::new(sink)).unwrap();
    bytes
}

pub fn decode(bytes: &Arc<Mutex<Vec<u8>>>) -> TraceFile {
    TraceReader::from_bytes(bytes.lock().unwrap().clone())
        .read_all()
        .unwrap()
}

/// Fails every write after the first `budget` bytes.
#[allow(dead_code)]
pub struct FailingSink {
    pub budget: usize,
}

impl TraceSink for FailingSink {
    fn write_all(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        if bytes.len() > self.budget {
            return Err(std::io::Error::other("no space left on device"));
        }
        self.budget -= bytes.len();
        Ok(())
    }
}
