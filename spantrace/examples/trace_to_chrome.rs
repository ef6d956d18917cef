//! Convert a binary span trace to Chrome trace-event JSON.
//!
//! Usage:
//!   cargo run --example trace_to_chrome -- <input.trace> [output.json]
//!
//! If output is omitted, writes to stdout. Open the result in Perfetto or
//! chrome://tracing.

use spantrace::tracer::{TraceReader, write_chrome_trace};
use std::io::{BufWriter, Write};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        eprintln!("usage: trace_to_chrome <input.trace> [output.json]");
        std::process::exit(1);
    }

    let trace = TraceReader::new(&args[1])?.read_all()?;
    eprintln!(
        "trace v{}, {} spans, {} missed, {} threads, converting...",
        trace.header.version,
        trace.footer.num_profiles,
        trace.footer.missed_profiles,
        trace.footer.num_threads
    );

    let out: Box<dyn Write> = if let Some(path) = args.get(2) {
        Box::new(std::fs::File::create(path)?)
    } else {
        Box::new(std::io::stdout().lock())
    };
    let mut w = BufWriter::new(out);
    write_chrome_trace(&trace, &mut w)?;
    w.flush()?;
    eprintln!("{} events written", trace.records.len());
    Ok(())
}
