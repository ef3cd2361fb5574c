//! Normalising input media into a fragmented DASH-style MP4 with `ffmpeg`.

use crate::probe::{AvFileInfo, ToolError};
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::info;

pub const OUTPUT_FILE_NAME: &str = "out.mp4";
pub const VIDEO_CODEC: &str = "h264";
pub const AUDIO_CODEC: &str = "aac";
/// Target fragment length in microseconds
pub const FRAGMENT_DURATION_US: u64 = 6_000_000;

/// Path of the normalised file inside `output_dir`.
pub fn output_path(output_dir: &Path) -> PathBuf {
    output_dir.join(OUTPUT_FILE_NAME)
}

/// Encoder to use for a stream: copy it when it already has the target codec.
fn codec_choice(current: Option<&str>, target: &str, encoder: &'static str, force: bool) -> String {
    if !force && current == Some(target) {
        "copy".to_string()
    } else {
        encoder.to_string()
    }
}

/// Build the `ffmpeg` argument list that writes `output` from `input`.
pub fn ffmpeg_args(info: &AvFileInfo, input: &Path, output: &Path, force: bool) -> Vec<OsString> {
    let audio = codec_choice(info.audio_codec(), AUDIO_CODEC, "aac", force);
    let video = codec_choice(info.video_codec(), VIDEO_CODEC, "libx264", force);

    let mut args: Vec<OsString> = vec!["-y".into(), "-i".into(), input.into()];
    for a in [
        "-c:a",
        audio.as_str(),
        "-c:v",
        video.as_str(),
        "-f",
        "mp4",
        "-movflags",
        "+skip_trailer+dash",
        "-frag_duration",
    ] {
        args.push(a.into());
    }
    args.push(FRAGMENT_DURATION_US.to_string().into());
    args.push(output.into());
    args
}

/// Run `ffmpeg` so that `output_dir/out.mp4` holds a fragmented copy of `input`.
pub fn transcode(info: &AvFileInfo, input: &Path, output_dir: &Path, force: bool) -> Result<PathBuf, ToolError> {
    let output = output_path(output_dir);
    let args = ffmpeg_args(info, input, &output, force);
    info!(input = %input.display(), output = %output.display(), "running ffmpeg");

    let result = Command::new("ffmpeg").args(&args).output().map_err(|e| {
        if e.kind() == io::ErrorKind::NotFound {
            ToolError::NotFound("ffmpeg")
        } else {
            ToolError::Io(e)
        }
    })?;

    if !result.status.success() {
        let stderr = String::from_utf8_lossy(&result.stderr);
        // ffmpeg prints its banner first; the cause is at the end
        let tail: Vec<&str> = stderr.lines().rev().take(5).collect();
        return Err(ToolError::Failed {
            tool: "ffmpeg",
            stderr: tail.into_iter().rev().collect::<Vec<_>>().join("\n"),
        });
    }
    Ok(output)
}
