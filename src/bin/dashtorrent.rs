use anyhow::Context;
use clap::{ArgAction, Parser};
use dashtorrent::{
    api::{DEFAULT_ANNOUNCE, TorrentOptions, create_torrent, manifest_for},
    manifest::write_segments_json,
    pieces::default_workers,
    probe::probe,
    transcode::transcode,
};
use std::num::NonZeroUsize;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(version, about = "Fragment a video for DASH and publish it as a torrent with a segment index")]
struct Args {
    /// Input media file
    input: PathBuf,

    /// Output directory for out.mp4, out.torrent and out.json
    #[arg(long, default_value = "./")]
    output: PathBuf,

    /// Re-encode audio and video even when the codecs already match
    #[arg(long, action = ArgAction::SetTrue)]
    force_transcode: bool,

    /// Input is already a fragmented MP4; index it in place without ffmpeg
    #[arg(long, action = ArgAction::SetTrue, conflicts_with = "force_transcode")]
    skip_transcode: bool,

    /// Also write the segment list as JSON
    #[arg(long, action = ArgAction::SetTrue)]
    json: bool,

    /// Tracker announce URL
    #[arg(long, default_value = DEFAULT_ANNOUNCE)]
    announce: String,

    /// Free-form torrent comment
    #[arg(long)]
    comment: Option<String>,

    /// Value of the "created by" field
    #[arg(long)]
    created_by: Option<String>,

    /// Hashing threads (defaults to available parallelism)
    #[arg(long)]
    threads: Option<NonZeroUsize>,

    /// Debug logging (RUST_LOG takes precedence)
    #[arg(short, long, action = ArgAction::SetTrue)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(env_filter).with_writer(std::io::stderr).init();

    std::fs::create_dir_all(&args.output)
        .with_context(|| format!("creating output directory {}", args.output.display()))?;

    let media = if args.skip_transcode {
        args.input.clone()
    } else {
        let source = probe(&args.input).with_context(|| format!("probing {}", args.input.display()))?;
        transcode(&source, &args.input, &args.output, args.force_transcode)
            .with_context(|| format!("transcoding {}", args.input.display()))?
    };

    let av = probe(&media).with_context(|| format!("probing {}", media.display()))?;
    let manifest = manifest_for(&media, &av)?;

    if args.json {
        let json_path = args.output.join("out.json");
        write_segments_json(&manifest.segments, &json_path)
            .with_context(|| format!("writing {}", json_path.display()))?;
    }

    let opts = TorrentOptions {
        announce: args.announce,
        comment: args.comment.unwrap_or_default(),
        created_by: args.created_by.unwrap_or_default(),
        workers: args.threads.unwrap_or_else(default_workers),
        ..Default::default()
    };

    let torrent_path = args.output.join("out.torrent");
    let summary = create_torrent(&media, manifest, &torrent_path, &opts)?;

    println!("{}  {}", summary.info_hash, torrent_path.display());
    Ok(())
}
