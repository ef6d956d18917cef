use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Destination for serialized trace bytes.
///
/// The serializer does its own buffering, so sinks receive a few large
/// writes rather than one per field.
pub trait TraceSink: Send {
    /// Write the whole slice. Short writes must be retried or reported.
    fn write_all(&mut self, bytes: &[u8]) -> std::io::Result<()>;

    /// Called once after the footer has been flushed.
    fn close(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<T: TraceSink + ?Sized> TraceSink for Box<T> {
    fn write_all(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        (**self).write_all(bytes)
    }

    fn close(&mut self) -> std::io::Result<()> {
        (**self).close()
    }
}

pub struct FileSink {
    file: Option<File>,
}

impl FileSink {
    /// Create (or truncate) the trace file, creating parent directories.
    pub fn create(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let file = File::create(path)?;
        Ok(Self { file: Some(file) })
    }
}

impl TraceSink for FileSink {
    fn write_all(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        match self.file.as_mut() {
            Some(file) => file.write_all(bytes),
            None => Err(std::io::Error::other("trace file already closed")),
        }
    }

    fn close(&mut self) -> std::io::Result<()> {
        if let Some(mut file) = self.file.take() {
            file.flush()?;
            file.sync_all()?;
        }
        Ok(())
    }
}

/// A sink that discards all bytes. Useful for measuring recording overhead
/// without I/O costs.
pub struct NullSink;

impl TraceSink for NullSink {
    fn write_all(&mut self, _bytes: &[u8]) -> std::io::Result<()> {
        Ok(())
    }
}

/// A sink that accumulates everything into a shared `Vec`.
///
/// ```rust
/// use spantrace::tracer::MemorySink;
///
/// let (sink, bytes) = MemorySink::new();
/// // ... begin_session_with_sink(Box::new(sink)) ...
/// assert!(bytes.lock().unwrap().is_empty());
/// ```
pub struct MemorySink(Arc<Mutex<Vec<u8>>>);

impl MemorySink {
    /// Create a new sink and return a handle to the shared byte buffer.
    pub fn new() -> (Self, Arc<Mutex<Vec<u8>>>) {
        let bytes = Arc::new(Mutex::new(Vec::new()));
        (Self(bytes.clone()), bytes)
    }
}

impl TraceSink for MemorySink {
    fn write_all(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        self.0
            .lock()
            .map_err(|_| std::io::Error::other("memory sink poisoned"))?
            .extend_from_slice(bytes);
        Ok(())
    }
}
