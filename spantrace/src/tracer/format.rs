//! Binary trace wire format (v1).
//!
//! ## File layout
//! ```text
//! Header:  version(u8) + performance_frequency(u64)                                  = 9 bytes
//! Event:   thread_id(u16) + name_size(u32) + name_bytes(N) + nul(u8)
//!          + time_start(u64) + time_end(u64)                                         = 23 + N bytes
//! Footer:  num_threads(u16) + num_syncs(u32) + missed_profiles(u64) + num_profiles(u64) = 22 bytes
//! ```
//!
//! All integers are little-endian. The header carries no event count: readers
//! either stream exactly `num_profiles` events or find the footer at
//! `file_len - FOOTER_SIZE`.
//!
//! Timestamps are raw ticks since session start; divide by
//! `performance_frequency` to get seconds.
//!
//! `num_syncs` counts sink flushes that happened before the footer was
//! written. The final flush carrying the footer is not included.

use crate::tracer::event::InternalEvent;
use serde::Serialize;
use std::io::{Error, ErrorKind, Read, Result, Write};

pub const VERSION: u8 = 1;
pub const HEADER_SIZE: usize = 9; // 1 version + 8 frequency
pub const FOOTER_SIZE: usize = 22; // 2 + 4 + 8 + 8
/// Event size excluding the name bytes.
pub const EVENT_FIXED_SIZE: usize = 2 + 4 + 1 + 8 + 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Header {
    pub version: u8,
    pub performance_frequency: u64,
}

impl Header {
    pub fn new(performance_frequency: u64) -> Self {
        Self {
            version: VERSION,
            performance_frequency,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Footer {
    pub num_threads: u16,
    pub num_syncs: u32,
    pub missed_profiles: u64,
    pub num_profiles: u64,
}

/// An event as read back from a trace file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TraceRecord {
    pub thread_id: u16,
    pub name: String,
    pub time_start: u64,
    pub time_end: u64,
}

/// Returns the wire size of an event.
pub fn wire_event_size(event: &InternalEvent) -> usize {
    EVENT_FIXED_SIZE + event.event.name.len()
}

pub fn write_header(w: &mut impl Write, header: &Header) -> Result<()> {
    w.write_all(&[header.version])?;
    w.write_all(&header.performance_frequency.to_le_bytes())
}

pub fn write_event(w: &mut impl Write, event: &InternalEvent) -> Result<()> {
    let name = event.event.name.as_bytes();
    w.write_all(&event.thread_id.to_le_bytes())?;
    w.write_all(&event.event.name_size().to_le_bytes())?;
    w.write_all(name)?;
    w.write_all(&[0])?;
    w.write_all(&event.event.time_start.to_le_bytes())?;
    w.write_all(&event.event.time_end.to_le_bytes())
}

pub fn write_footer(w: &mut impl Write, footer: &Footer) -> Result<()> {
    w.write_all(&footer.num_threads.to_le_bytes())?;
    w.write_all(&footer.num_syncs.to_le_bytes())?;
    w.write_all(&footer.missed_profiles.to_le_bytes())?;
    w.write_all(&footer.num_profiles.to_le_bytes())
}

fn read_array<const N: usize>(r: &mut impl Read) -> Result<[u8; N]> {
    let mut bytes = [0u8; N];
    r.read_exact(&mut bytes)?;
    Ok(bytes)
}

pub fn read_header(r: &mut impl Read) -> Result<Header> {
    let [version] = read_array::<1>(r)?;
    if version != VERSION {
        return Err(Error::new(
            ErrorKind::InvalidData,
            format!("unsupported trace version {version}"),
        ));
    }
    let performance_frequency = u64::from_le_bytes(read_array(r)?);
    Ok(Header {
        version,
        performance_frequency,
    })
}

/// Read one event. Fails on EOF, since the event count is known up front.
pub fn read_event(r: &mut impl Read) -> Result<TraceRecord> {
    let thread_id = u16::from_le_bytes(read_array(r)?);
    let name_size = u32::from_le_bytes(read_array(r)?) as u64;
    // Grows with the bytes actually present, not with the untrusted length.
    let mut name = Vec::new();
    if r.by_ref().take(name_size).read_to_end(&mut name)? as u64 != name_size {
        return Err(Error::new(ErrorKind::UnexpectedEof, "event name truncated"));
    }
    let [nul] = read_array::<1>(r)?;
    if nul != 0 {
        return Err(Error::new(
            ErrorKind::InvalidData,
            "event name is not NUL-terminated",
        ));
    }
    let time_start = u64::from_le_bytes(read_array(r)?);
    let time_end = u64::from_le_bytes(read_array(r)?);
    Ok(TraceRecord {
        thread_id,
        name: String::from_utf8_lossy(&name).into_owned(),
        time_start,
        time_end,
    })
}

pub fn read_footer(r: &mut impl Read) -> Result<Footer> {
    Ok(Footer {
        num_threads: u16::from_le_bytes(read_array(r)?),
        num_syncs: u32::from_le_bytes(read_array(r)?),
        missed_profiles: u64::from_le_bytes(read_array(r)?),
        num_profiles: u64::from_le_bytes(read_array(r)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracer::event::Event;
    use std::io::Cursor;

    #[test]
    fn test_header_layout() {
        let mut buf = Vec::new();
        write_header(&mut buf, &Header::new(1_000_000_000)).unwrap();
        assert_eq!(buf.len(), HEADER_SIZE);
        assert_eq!(buf[0], VERSION);
        assert_eq!(&buf[1..], &1_000_000_000u64.to_le_bytes());
    }

    #[test]
    fn test_event_layout() {
        let event = InternalEvent::new(0x0102, Event::new("abc", 5, 9));
        let mut buf = Vec::new();
        write_event(&mut buf, &event).unwrap();
        assert_eq!(buf.len(), wire_event_size(&event));
        assert_eq!(buf.len(), 26);
        assert_eq!(&buf[0..2], &[0x02, 0x01]);
        assert_eq!(&buf[2..6], &3u32.to_le_bytes());
        assert_eq!(&buf[6..10], b"abc\0");
        assert_eq!(&buf[10..18], &5u64.to_le_bytes());
        assert_eq!(&buf[18..26], &9u64.to_le_bytes());

        let record = read_event(&mut Cursor::new(&buf)).unwrap();
        assert_eq!(record.thread_id, 0x0102);
        assert_eq!(record.name, "abc");
        assert_eq!((record.time_start, record.time_end), (5, 9));
    }

    #[test]
    fn test_footer_layout() {
        let footer = Footer {
            num_threads: 3,
            num_syncs: 7,
            missed_profiles: 11,
            num_profiles: 13,
        };
        let mut buf = Vec::new();
        write_footer(&mut buf, &footer).unwrap();
        assert_eq!(buf.len(), FOOTER_SIZE);
        assert_eq!(read_footer(&mut Cursor::new(&buf)).unwrap(), footer);
    }

    #[test]
    fn test_read_header_rejects_unknown_version() {
        let buf = [2u8, 0, 0, 0, 0, 0, 0, 0, 0];
        let err = read_header(&mut Cursor::new(&buf)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidData);
    }

    #[test]
    fn test_read_event_requires_nul() {
        let event = InternalEvent::new(0, Event::new("x", 0, 0));
        let mut buf = Vec::new();
        write_event(&mut buf, &event).unwrap();
        buf[7] = b'!';
        let err = read_event(&mut Cursor::new(&buf)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidData);
    }

    #[test]
    fn test_read_event_truncated() {
        let event = InternalEvent::new(0, Event::new("name", 0, 0));
        let mut buf = Vec::new();
        write_event(&mut buf, &event).unwrap();
        buf.truncate(buf.len() - 1);
        let err = read_event(&mut Cursor::new(&buf)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_read_event_oversized_name_is_truncated() {
        let mut buf = vec![0u8, 0];
        buf.extend_from_slice(&u32::MAX.to_le_bytes());
        buf.extend_from_slice(b"abc\0");
        let err = read_event(&mut Cursor::new(&buf)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnexpectedEof);
    }
}
