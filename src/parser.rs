use crate::boxes::{BoxHeader, FourCC};
use byteorder::{BigEndian, ReadBytesExt};
use std::io::{self, Read, Seek};

#[derive(thiserror::Error, Debug)]
pub enum ParseError {
    #[error("io: {0}")]
    Io(#[from] io::Error),
    #[error("invalid box size {size} at offset {offset}")]
    InvalidSize { offset: u64, size: u64 },
    #[error("truncated {typ} box at offset {offset}: expected {expected} bytes, got {actual}")]
    Truncated {
        typ: FourCC,
        offset: u64,
        expected: u64,
        actual: u64,
    },
    #[error("timescale must be non-zero")]
    ZeroTimescale,
    #[error("no segment index (sidx) box found")]
    NoSegmentIndex,
}

pub type Result<T> = std::result::Result<T, ParseError>;

/// Read a compact box header at the current stream position.
///
/// Only the 32-bit size form is accepted. A size of 1 (64-bit `largesize`
/// follows) or 0 (box runs to end of file) is smaller than the header itself
/// and is rejected like any other undersized box.
pub fn read_box_header<R: Read + Seek>(r: &mut R) -> Result<BoxHeader> {
    let start = r.stream_position()?;
    let size = r.read_u32::<BigEndian>()? as u64;
    let mut typ = [0u8; 4];
    r.read_exact(&mut typ)?;

    if size < BoxHeader::LEN {
        return Err(ParseError::InvalidSize {
            offset: start,
            size,
        });
    }

    Ok(BoxHeader {
        size,
        typ: FourCC(typ),
        start,
    })
}

/// Read the whole payload of `hdr`, failing with [`ParseError::Truncated`]
/// when the stream ends first.
pub fn read_payload<R: Read>(r: &mut R, hdr: &BoxHeader) -> Result<Vec<u8>> {
    let expected = hdr.payload_len();
    let mut buf = Vec::new();
    r.take(expected).read_to_end(&mut buf)?;
    if (buf.len() as u64) < expected {
        return Err(ParseError::Truncated {
            typ: hdr.typ,
            offset: hdr.start,
            expected,
            actual: buf.len() as u64,
        });
    }
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn rejects_large_size_marker() {
        let mut v = Vec::new();
        v.extend_from_slice(&1u32.to_be_bytes());
        v.extend_from_slice(b"mdat");
        v.extend_from_slice(&64u64.to_be_bytes());

        let err = read_box_header(&mut Cursor::new(v)).unwrap_err();
        assert!(matches!(err, ParseError::InvalidSize { offset: 0, size: 1 }));
    }

    #[test]
    fn short_payload_is_truncated() {
        let mut v = Vec::new();
        v.extend_from_slice(&32u32.to_be_bytes());
        v.extend_from_slice(b"free");
        v.extend_from_slice(&[0u8; 10]);

        let mut cur = Cursor::new(v);
        let hdr = read_box_header(&mut cur).unwrap();
        match read_payload(&mut cur, &hdr).unwrap_err() {
            ParseError::Truncated {
                expected, actual, ..
            } => {
                assert_eq!(expected, 24);
                assert_eq!(actual, 10);
            }
            e => panic!("unexpected error: {e}"),
        }
    }
}
