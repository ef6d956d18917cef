use crate::tracer::error::{Result, TraceError};
use crate::tracer::format::{
    self, EVENT_FIXED_SIZE, FOOTER_SIZE, Footer, HEADER_SIZE, Header, TraceRecord,
};
use serde::Serialize;
use std::io::{Cursor, ErrorKind};
use std::path::Path;

/// A fully decoded trace file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TraceFile {
    pub header: Header,
    pub records: Vec<TraceRecord>,
    pub footer: Footer,
}

impl TraceFile {
    /// Records of one thread, in the order they were written.
    pub fn records_for_thread(&self, thread_id: u16) -> impl Iterator<Item = &TraceRecord> {
        self.records.iter().filter(move |r| r.thread_id == thread_id)
    }

    /// Record timestamps converted to seconds.
    pub fn seconds(&self, ticks: u64) -> f64 {
        ticks as f64 / self.header.performance_frequency.max(1) as f64
    }
}

pub struct TraceReader {
    cursor: Cursor<Vec<u8>>,
}

impl TraceReader {
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::from_bytes(std::fs::read(path)?))
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self {
            cursor: Cursor::new(bytes),
        }
    }

    pub fn read_header(&mut self) -> Result<Header> {
        format::read_header(&mut self.cursor).map_err(corrupt("header"))
    }

    /// Read the record at the current position. The caller knows how many
    /// records there are from the footer; nothing marks the end of the stream.
    pub fn read_record(&mut self) -> Result<TraceRecord> {
        format::read_event(&mut self.cursor).map_err(corrupt("event record"))
    }

    /// Decode the whole file, locating the footer from the end.
    pub fn read_all(&mut self) -> Result<TraceFile> {
        let len = self.cursor.get_ref().len();
        if len < HEADER_SIZE + FOOTER_SIZE {
            return Err(TraceError::Corrupt(format!(
                "trace is {len} bytes, shorter than header plus footer"
            )));
        }
        let body_end = len - FOOTER_SIZE;

        self.cursor.set_position(body_end as u64);
        let footer = format::read_footer(&mut self.cursor).map_err(corrupt("footer"))?;

        self.cursor.set_position(0);
        let header = self.read_header()?;

        let mut records = Vec::new();
        for index in 0..footer.num_profiles {
            if self.position() >= body_end {
                return Err(TraceError::Corrupt(format!(
                    "footer claims {} records but the body ends after {index}",
                    footer.num_profiles
                )));
            }
            let record_end =
                (self.position() + EVENT_FIXED_SIZE).saturating_add(self.peek_name_size()?);
            if record_end > body_end {
                return Err(TraceError::Corrupt(format!(
                    "record {index} runs into the footer"
                )));
            }
            records.push(self.read_record()?);
            if self.position() > body_end {
                return Err(TraceError::Corrupt(format!(
                    "record {index} runs into the footer"
                )));
            }
        }
        if self.position() != body_end {
            return Err(TraceError::Corrupt(format!(
                "{} unaccounted bytes between the last record and the footer",
                body_end - self.position()
            )));
        }

        Ok(TraceFile {
            header,
            records,
            footer,
        })
    }

    /// `name_size` of the record at the current position, without consuming it.
    fn peek_name_size(&self) -> Result<usize> {
        let at = self.position() + 2;
        self.cursor
            .get_ref()
            .get(at..at + 4)
            .and_then(|b| <[u8; 4]>::try_from(b).ok())
            .map(|b| u32::from_le_bytes(b) as usize)
            .ok_or_else(|| TraceError::Corrupt("truncated event record".into()))
    }

    fn position(&self) -> usize {
        self.cursor.position() as usize
    }
}

fn corrupt(what: &'static str) -> impl Fn(std::io::Error) -> TraceError {
    move |e| match e.kind() {
        ErrorKind::UnexpectedEof => TraceError::Corrupt(format!("truncated {what}")),
        _ => TraceError::Corrupt(format!("bad {what}: {e}")),
    }
}
