use crate::{
    manifest::Manifest,
    metainfo::{InfoDict, InfoHash, MetaInfo},
    pieces::{PiecePlan, default_workers, hash_pieces},
    probe::AvFileInfo,
    segments::segments_from_path,
};
use anyhow::Context;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::num::NonZeroUsize;
use std::path::Path;
use tracing::{info, warn};

pub const DEFAULT_ANNOUNCE: &str = "http://tracker.vanitycore.co:6969/announce";

/// Tracker fields and hashing settings for [`create_torrent`].
#[derive(Debug, Clone)]
pub struct TorrentOptions {
    pub announce: String,
    pub announce_list: Vec<Vec<String>>,
    pub comment: String,
    pub created_by: String,
    /// Seconds since the Unix epoch; left out of the file when `None`
    pub creation_date: Option<i64>,
    /// Hashing pool size
    pub workers: NonZeroUsize,
    pub plan: PiecePlan,
}

impl Default for TorrentOptions {
    fn default() -> Self {
        Self {
            announce: DEFAULT_ANNOUNCE.to_string(),
            announce_list: Vec::new(),
            comment: String::new(),
            created_by: String::new(),
            creation_date: None,
            workers: default_workers(),
            plan: PiecePlan::default(),
        }
    }
}

/// What was written, for reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TorrentSummary {
    pub info_hash: InfoHash,
    pub name: String,
    pub length: u64,
    pub piece_length: u64,
    pub piece_count: usize,
    pub segment_count: usize,
}

/// Scan `media` for segments and attach the prober's duration and bit rate.
///
/// # Example
/// ```no_run
/// use dashtorrent::{api::manifest_for, probe::probe};
/// use std::path::Path;
///
/// let media = Path::new("out/out.mp4");
/// let manifest = manifest_for(media, &probe(media)?)?;
/// println!("{} segments", manifest.segments.len());
/// # Ok::<(), anyhow::Error>(())
/// ```
pub fn manifest_for(media: &Path, av: &AvFileInfo) -> anyhow::Result<Manifest> {
    let segments = segments_from_path(media)
        .with_context(|| format!("scanning segments of {}", media.display()))?;
    if av.bitrate == 0 {
        warn!(path = %media.display(), "prober reported no bit rate");
    }
    Ok(Manifest {
        duration: av.duration as i64,
        bitrate: i64::try_from(av.bitrate).unwrap_or(i64::MAX),
        segments,
    })
}

/// Hash `media` and assemble its metainfo with `manifest` attached.
pub fn build_metainfo(media: &Path, manifest: Manifest, opts: &TorrentOptions) -> anyhow::Result<MetaInfo> {
    let file = File::open(media).with_context(|| format!("opening {}", media.display()))?;
    let length = file.metadata()?.len();
    let name = media
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .context("media path has no file name")?;

    let piece_length = opts.plan.piece_length(length);
    let pieces = hash_pieces(&file, length, piece_length, opts.workers)
        .with_context(|| format!("hashing pieces of {}", media.display()))?;

    Ok(MetaInfo {
        info: InfoDict {
            name,
            length,
            piece_length,
            pieces,
            ..Default::default()
        },
        announce: opts.announce.clone(),
        announce_list: opts.announce_list.clone(),
        creation_date: opts.creation_date,
        comment: opts.comment.clone(),
        created_by: opts.created_by.clone(),
        manifest,
        ..Default::default()
    })
}

/// Build the torrent for `media` and write it to `output`.
pub fn create_torrent(
    media: &Path,
    manifest: Manifest,
    output: &Path,
    opts: &TorrentOptions,
) -> anyhow::Result<TorrentSummary> {
    let mi = build_metainfo(media, manifest, opts)?;
    let info_hash = mi.info_hash();

    let mut w = BufWriter::new(
        File::create(output).with_context(|| format!("creating {}", output.display()))?,
    );
    mi.write_to(&mut w)
        .and_then(|()| w.flush())
        .with_context(|| format!("writing {}", output.display()))?;

    let summary = TorrentSummary {
        info_hash,
        name: mi.info.name.clone(),
        length: mi.info.length,
        piece_length: mi.info.piece_length,
        piece_count: mi.info.piece_count(),
        segment_count: mi.manifest.segments.len(),
    };
    info!(
        info_hash = %summary.info_hash,
        pieces = summary.piece_count,
        piece_length = summary.piece_length,
        segments = summary.segment_count,
        path = %output.display(),
        "wrote torrent"
    );
    Ok(summary)
}
