use thiserror::Error;

#[derive(Error, Debug)]
pub enum TraceError {
    #[error("a trace session is already running")]
    AlreadyRunning,

    #[error("no trace session is running")]
    NotRunning,

    #[error("trace writer thread panicked")]
    WriterPanicked,

    #[error("trace sink error: {0}")]
    Sink(#[from] std::io::Error),

    #[error("failed to spawn trace writer thread: {0}")]
    Spawn(std::io::Error),

    #[error("failed to allocate trace buffers: {0}")]
    Alloc(#[from] std::collections::TryReserveError),

    #[error("invalid tracer configuration: {0}")]
    InvalidConfig(&'static str),

    #[error("corrupt trace file: {0}")]
    Corrupt(String),
}

pub type Result<T> = std::result::Result<T, TraceError>;
