use crate::parser::{ParseError, Result, read_box_header, read_payload};
use crate::sidx::SidxBox;
use crate::timescale::{scale_ticks, whole_millis};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// One media fragment: an inclusive byte range of the file and its playback window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    /// 0-based sequence number
    pub index: u32,
    /// First byte of the fragment (offset of its `sidx` box)
    #[serde(rename = "start")]
    pub byte_start: u64,
    /// Last byte of the fragment; the final segment ends at the file size
    #[serde(rename = "end")]
    pub byte_end: u64,
    /// Playback start in milliseconds
    #[serde(rename = "start_time")]
    pub time_start: u64,
    /// Playback end in milliseconds
    #[serde(rename = "end_time")]
    pub time_end: u64,
}

/// Walk the top-level boxes of `r` and build the segment list from its `sidx` boxes.
///
/// Fragmented files written with DASH flags alternate a presentation-level
/// `sidx` with a fragment-level one. Starting with the first, every other
/// `sidx` opens a segment; the ones in between are skipped.
///
/// Any malformed box aborts the scan; no partial list is returned.
pub fn scan_segments<R: Read + Seek>(r: &mut R, size: u64) -> Result<Vec<Segment>> {
    let mut segments: Vec<Segment> = Vec::new();
    let mut running = Duration::ZERO;
    let mut take_next_sidx = true;
    let mut pos = 0u64;

    while size.saturating_sub(pos) >= 8 {
        r.seek(SeekFrom::Start(pos))?;
        let h = read_box_header(r)?;
        if h.end() > size {
            return Err(ParseError::Truncated {
                typ: h.typ,
                offset: h.start,
                expected: h.size,
                actual: size - h.start,
            });
        }

        if h.is_sidx() {
            if take_next_sidx {
                if let Some(prev) = segments.last_mut() {
                    prev.byte_end = pos - 1;
                }

                let payload = read_payload(r, &h)?;
                let sidx = SidxBox::parse(&payload, &h)?;

                let time_start = whole_millis(running);
                running += scale_ticks(sidx.subsegment_duration as u64, sidx.timescale)?;
                let time_end = whole_millis(running);

                debug!(
                    index = segments.len(),
                    offset = pos,
                    timescale = sidx.timescale,
                    duration = sidx.subsegment_duration,
                    "segment index"
                );

                segments.push(Segment {
                    index: segments.len() as u32,
                    byte_start: pos,
                    byte_end: pos,
                    time_start,
                    time_end,
                });
            }
            take_next_sidx = !take_next_sidx;
        }

        pos = h.end();
    }

    match segments.last_mut() {
        Some(last) => last.byte_end = size,
        None => return Err(ParseError::NoSegmentIndex),
    }
    Ok(segments)
}

/// Open `path` and scan it with [`scan_segments`].
pub fn segments_from_path(path: impl AsRef<Path>) -> Result<Vec<Segment>> {
    let f = File::open(path)?;
    let size = f.metadata()?.len();
    scan_segments(&mut BufReader::new(f), size)
}
