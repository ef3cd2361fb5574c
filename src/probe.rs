//! Container metadata from `ffprobe`.

use serde::Deserialize;
use std::io;
use std::path::Path;
use std::process::Command;
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("{0} not found on PATH")]
    NotFound(&'static str),
    #[error("{tool} failed: {stderr}")]
    Failed { tool: &'static str, stderr: String },
    #[error("io: {0}")]
    Io(#[from] io::Error),
    #[error("ffprobe output: {0}")]
    Json(#[from] serde_json::Error),
    #[error("ffprobe reported no format section")]
    MissingFormat,
    #[error("invalid {field} value {value:?}")]
    InvalidField { field: &'static str, value: String },
}

/// One stream entry of `ffprobe -show_streams`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct StreamInfo {
    #[serde(rename = "codec_type", default)]
    pub kind: String,
    #[serde(default)]
    pub index: u32,
    #[serde(default)]
    pub codec_name: String,
    pub profile: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub sample_rate: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
    size: Option<String>,
    bit_rate: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    streams: Vec<StreamInfo>,
    format: Option<FfprobeFormat>,
}

/// First audio and video stream plus container totals.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AvFileInfo {
    pub video: Option<StreamInfo>,
    pub audio: Option<StreamInfo>,
    /// Seconds
    pub duration: f64,
    /// Bytes
    pub size: u64,
    /// Bits per second
    pub bitrate: u64,
}

impl AvFileInfo {
    pub fn video_codec(&self) -> Option<&str> {
        self.video.as_ref().map(|s| s.codec_name.as_str())
    }

    pub fn audio_codec(&self) -> Option<&str> {
        self.audio.as_ref().map(|s| s.codec_name.as_str())
    }
}

/// Run `ffprobe` on `path` and parse its JSON report.
pub fn probe(path: &Path) -> Result<AvFileInfo, ToolError> {
    debug!(path = %path.display(), "running ffprobe");
    let output = Command::new("ffprobe")
        .args(["-v", "quiet", "-print_format", "json", "-show_format", "-show_streams"])
        .arg(path)
        .output()
        .map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                ToolError::NotFound("ffprobe")
            } else {
                ToolError::Io(e)
            }
        })?;

    if !output.status.success() {
        return Err(ToolError::Failed {
            tool: "ffprobe",
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    parse_probe_output(&output.stdout)
}

/// Parse the JSON written by `ffprobe -print_format json -show_format -show_streams`.
pub fn parse_probe_output(json: &[u8]) -> Result<AvFileInfo, ToolError> {
    let out: FfprobeOutput = serde_json::from_slice(json)?;
    let format = out.format.ok_or(ToolError::MissingFormat)?;

    let mut info = AvFileInfo {
        duration: parse_field("duration", format.duration)?,
        size: parse_field("size", format.size)?,
        bitrate: parse_field("bit_rate", format.bit_rate)?,
        ..Default::default()
    };

    for stream in out.streams {
        match stream.kind.as_str() {
            "video" if info.video.is_none() => info.video = Some(stream),
            "audio" if info.audio.is_none() => info.audio = Some(stream),
            _ => {}
        }
    }
    Ok(info)
}

fn parse_field<T: std::str::FromStr>(field: &'static str, raw: Option<String>) -> Result<T, ToolError> {
    let value = raw.unwrap_or_default();
    value
        .trim()
        .parse()
        .map_err(|_| ToolError::InvalidField { field, value })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "streams": [
            {"index": 0, "codec_name": "h264", "profile": "High", "codec_type": "video", "width": 1280, "height": 720},
            {"index": 1, "codec_name": "aac", "profile": "LC", "codec_type": "audio", "sample_rate": "48000"},
            {"index": 2, "codec_name": "mov_text", "codec_type": "subtitle"}
        ],
        "format": {"filename": "in.mp4", "duration": "12.480000", "size": "1048576", "bit_rate": "672164"}
    }"#;

    #[test]
    fn parses_streams_and_format() {
        let info = parse_probe_output(SAMPLE.as_bytes()).unwrap();
        assert_eq!(info.video_codec(), Some("h264"));
        assert_eq!(info.audio_codec(), Some("aac"));
        let video = info.video.unwrap();
        assert_eq!((video.width, video.height), (Some(1280), Some(720)));
        assert_eq!(info.audio.unwrap().sample_rate.as_deref(), Some("48000"));
        assert!((info.duration - 12.48).abs() < 1e-9);
        assert_eq!(info.size, 1_048_576);
        assert_eq!(info.bitrate, 672_164);
    }

    #[test]
    fn bad_numbers_are_fatal() {
        let json = r#"{"streams": [], "format": {"duration": "1.0", "size": "12", "bit_rate": "N/A"}}"#;
        match parse_probe_output(json.as_bytes()).unwrap_err() {
            ToolError::InvalidField { field, value } => {
                assert_eq!(field, "bit_rate");
                assert_eq!(value, "N/A");
            }
            e => panic!("unexpected error: {e}"),
        }
    }

    #[test]
    fn missing_format_is_fatal() {
        let err = parse_probe_output(br#"{"streams": []}"#).unwrap_err();
        assert!(matches!(err, ToolError::MissingFormat));
    }
}
