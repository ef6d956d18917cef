mod buffer;
pub mod chrome;
pub mod clock;
pub mod config;
mod error;
mod event;
pub mod format;
mod lock;
pub mod reader;
mod registry;
mod scope;
mod serializer;
mod session;
pub mod sink;

pub use chrome::{to_chrome_json, write_chrome_trace};
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use config::{TracerBuilder, TracerConfig};
pub use error::{Result, TraceError};
pub use event::{Append, Event, InternalEvent};
pub use format::{Footer, Header, TraceRecord};
pub use reader::{TraceFile, TraceReader};
pub use scope::ScopeGuard;
pub use session::{SessionState, TraceSummary, Tracer};
pub use sink::{FileSink, MemorySink, NullSink, TraceSink};
