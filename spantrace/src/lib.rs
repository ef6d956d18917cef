#![doc = include_str!("../README.md")]

pub mod tracer;

use std::path::Path;
use std::sync::LazyLock;
use tracer::{Append, Event, ScopeGuard, TraceSummary, Tracer};

static GLOBAL: LazyLock<Tracer> = LazyLock::new(Tracer::new);

/// The process-wide tracer behind the free functions, with default settings.
pub fn global() -> &'static Tracer {
    &GLOBAL
}

/// Start a session on the global tracer. See [`Tracer::begin_session`].
pub fn begin_session(path: impl AsRef<Path>) -> tracer::Result<()> {
    GLOBAL.begin_session(path)
}

/// End the global session. See [`Tracer::end_session`].
pub fn end_session() -> tracer::Result<TraceSummary> {
    GLOBAL.end_session()
}

/// Record a finished span into the global session. Returns
/// [`Append::Closed`] when no session is running.
pub fn record(event: Event) -> Append {
    GLOBAL.record(event)
}

/// Ticks since the global session started.
pub fn now() -> u64 {
    GLOBAL.now()
}

/// Open a span on the global tracer, recorded when the guard drops.
pub fn span(name: &'static str) -> ScopeGuard<'static> {
    GLOBAL.span(name)
}

/// Record the rest of the enclosing block as a span.
///
/// ```rust
/// fn load() {
///     spantrace::trace_scope!("load");
///     // ...
/// }
/// # load();
/// ```
///
/// Pass a tracer first to record into something other than the global one:
/// `trace_scope!(&tracer, "load")`.
#[macro_export]
macro_rules! trace_scope {
    ($name:expr) => {
        let _spantrace_guard = $crate::span($name);
    };
    ($tracer:expr, $name:expr) => {
        let _spantrace_guard = $crate::tracer::Tracer::span($tracer, $name);
    };
}
