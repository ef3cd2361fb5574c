pub mod api;
pub mod bencode;
pub mod boxes;
pub mod manifest;
pub mod metainfo;
pub mod parser;
pub mod pieces;
pub mod probe;
pub mod segments;
pub mod sidx;
pub mod timescale;
pub mod transcode;

pub use api::{TorrentOptions, TorrentSummary, create_torrent, manifest_for};
pub use boxes::{BoxHeader, FourCC};
pub use manifest::Manifest;
pub use metainfo::{InfoDict, InfoHash, MetaInfo};
pub use parser::{ParseError, read_box_header};
pub use pieces::{PiecePlan, PlanError, hash_pieces};
pub use segments::{Segment, scan_segments, segments_from_path};
pub use timescale::scale_ticks;
