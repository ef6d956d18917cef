//! Export to the Chrome trace-event JSON format, loadable in Perfetto or
//! `chrome://tracing`.

use crate::tracer::format::Footer;
use crate::tracer::reader::TraceFile;
use serde::Serialize;
use std::io::Write;

const MICROS_PER_SEC: f64 = 1_000_000.0;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChromeTrace<'a> {
    pub trace_events: Vec<ChromeEvent<'a>>,
    pub display_time_unit: &'static str,
    pub other_data: &'a Footer,
}

/// One complete (`"ph": "X"`) event.
#[derive(Debug, Serialize)]
pub struct ChromeEvent<'a> {
    pub name: &'a str,
    pub cat: &'static str,
    pub ph: &'static str,
    /// Microseconds since session start.
    pub ts: f64,
    pub dur: f64,
    pub pid: u32,
    pub tid: u16,
}

impl<'a> ChromeTrace<'a> {
    pub fn from_trace(trace: &'a TraceFile) -> Self {
        let to_micros = MICROS_PER_SEC / trace.header.performance_frequency.max(1) as f64;
        let trace_events = trace
            .records
            .iter()
            .map(|r| ChromeEvent {
                name: &r.name,
                cat: "span",
                ph: "X",
                ts: r.time_start as f64 * to_micros,
                dur: r.time_end.saturating_sub(r.time_start) as f64 * to_micros,
                pid: 1,
                tid: r.thread_id,
            })
            .collect();
        Self {
            trace_events,
            display_time_unit: "ns",
            other_data: &trace.footer,
        }
    }
}

pub fn write_chrome_trace(trace: &TraceFile, w: impl Write) -> serde_json::Result<()> {
    serde_json::to_writer(w, &ChromeTrace::from_trace(trace))
}

pub fn to_chrome_json(trace: &TraceFile) -> serde_json::Result<String> {
    serde_json::to_string(&ChromeTrace::from_trace(trace))
}
