//! Trace fifty waits of varying length into a file.
//!
//! Usage:
//!   cargo run --example random_wait -- [output.trace]
//!
//! Convert the result with the `trace_to_chrome` example.

use std::time::Duration;

fn wait(i: u64) {
    spantrace::trace_scope!("random wait");
    // Cheap scatter, enough to make the spans uneven.
    let millis = (i * 37 + 11) % 23;
    std::thread::sleep(Duration::from_millis(millis));
}

fn main() -> spantrace::tracer::Result<()> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "trace.trace".to_string());

    spantrace::begin_session(&path)?;
    for i in 0..50 {
        eprint!("{i}, ");
        wait(i);
    }
    let summary = spantrace::end_session()?;
    eprintln!();
    eprintln!(
        "{} spans written to {path} ({} missed, {} threads)",
        summary.num_profiles, summary.missed_profiles, summary.num_threads
    );
    Ok(())
}
