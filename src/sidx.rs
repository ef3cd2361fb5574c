use crate::boxes::BoxHeader;
use crate::parser::{ParseError, Result};
use byteorder::{BigEndian, ReadBytesExt};
use std::io::{self, Cursor};

/// The fields of a segment index box that the segment extractor relies on.
///
/// Only the first reference entry is read; fragmented files produced by the
/// transcoder carry one reference per fragment-level index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SidxBox {
    pub version: u8,
    pub timescale: u32,
    pub earliest_presentation_time: u64,
    pub first_offset: u64,
    pub reference_count: u16,
    pub subsegment_duration: u32,
}

impl SidxBox {
    /// Decode a `sidx` payload (everything after the 8-byte header).
    pub fn parse(payload: &[u8], hdr: &BoxHeader) -> Result<Self> {
        let mut cur = Cursor::new(payload);
        Self::read_fields(&mut cur).map_err(|e| {
            if e.kind() == io::ErrorKind::UnexpectedEof {
                ParseError::Truncated {
                    typ: hdr.typ,
                    offset: hdr.start,
                    expected: Self::min_payload_len(payload.first().copied().unwrap_or(0)),
                    actual: payload.len() as u64,
                }
            } else {
                ParseError::Io(e)
            }
        })
    }

    fn read_fields(cur: &mut Cursor<&[u8]>) -> io::Result<Self> {
        let version = cur.read_u8()?;
        let _flags = cur.read_u24::<BigEndian>()?;
        let _reference_id = cur.read_u32::<BigEndian>()?;
        let timescale = cur.read_u32::<BigEndian>()?;

        let (earliest_presentation_time, first_offset) = if version == 0 {
            let earliest = cur.read_u32::<BigEndian>()? as u64;
            let first = cur.read_u32::<BigEndian>()? as u64;
            (earliest, first)
        } else {
            let earliest = cur.read_u64::<BigEndian>()?;
            let first = cur.read_u64::<BigEndian>()?;
            (earliest, first)
        };

        let _reserved = cur.read_u16::<BigEndian>()?;
        let reference_count = cur.read_u16::<BigEndian>()?;

        // reference_type (1 bit) + referenced_size (31 bits)
        let _reference = cur.read_u32::<BigEndian>()?;
        let subsegment_duration = cur.read_u32::<BigEndian>()?;

        Ok(SidxBox {
            version,
            timescale,
            earliest_presentation_time,
            first_offset,
            reference_count,
            subsegment_duration,
        })
    }

    /// Bytes needed to reach the first subsegment duration for `version`.
    pub fn min_payload_len(version: u8) -> u64 {
        let times = if version == 0 { 8 } else { 16 };
        1 + 3 + 4 + 4 + times + 2 + 2 + 4 + 4
    }
}
