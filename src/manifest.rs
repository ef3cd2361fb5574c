use crate::bencode::{Dict, Value, put};
use crate::segments::Segment;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Segment index carried inside the torrent under the `manifest` key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// Whole seconds, as reported by the prober
    pub duration: i64,
    /// Bits per second, as reported by the prober
    pub bitrate: i64,
    pub segments: Vec<Segment>,
}

impl Manifest {
    pub fn to_value(&self) -> Value {
        let segments = self.segments.iter().map(segment_value).collect::<Vec<_>>();

        let mut m = Dict::new();
        put(&mut m, "duration", self.duration);
        put(&mut m, "bitrate", self.bitrate);
        put(&mut m, "segments", segments);
        Value::Dict(m)
    }
}

fn segment_value(seg: &Segment) -> Value {
    let mut s = Dict::new();
    put(&mut s, "index", seg.index as i64);
    put(&mut s, "start", clamp_i64(seg.byte_start));
    put(&mut s, "start_time", clamp_i64(seg.time_start));
    put(&mut s, "end", clamp_i64(seg.byte_end));
    put(&mut s, "end_time", clamp_i64(seg.time_end));
    Value::Dict(s)
}

pub(crate) fn clamp_i64(v: u64) -> i64 {
    i64::try_from(v).unwrap_or(i64::MAX)
}

/// Write the segment list as a JSON array, one object per segment.
pub fn write_segments_json(segments: &[Segment], path: impl AsRef<Path>) -> anyhow::Result<()> {
    write_json(segments, path.as_ref())
}

/// Write the full manifest (duration, bitrate, segments) as JSON.
pub fn write_manifest_json(manifest: &Manifest, path: impl AsRef<Path>) -> anyhow::Result<()> {
    write_json(manifest, path.as_ref())
}

fn write_json<T: Serialize + ?Sized>(value: &T, path: &Path) -> anyhow::Result<()> {
    let mut w = BufWriter::new(File::create(path)?);
    serde_json::to_writer(&mut w, value)?;
    w.write_all(b"\n")?;
    w.flush()?;
    Ok(())
}
