use crate::bencode::{self, Dict, Value, put};
use crate::manifest::{Manifest, clamp_i64};
use crate::pieces::DIGEST_LEN;
use sha1::{Digest, Sha1};
use std::fmt;
use std::io::{self, Write};

/// One entry of a multi-file torrent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileDict {
    pub length: u64,
    pub path: Vec<String>,
    pub md5sum: String,
}

impl FileDict {
    fn to_dict(&self) -> Dict {
        let mut d = Dict::new();
        if self.length > 0 {
            put(&mut d, "length", clamp_i64(self.length));
        }
        if !self.path.is_empty() {
            let parts = self.path.iter().map(|p| Value::string(p)).collect::<Vec<_>>();
            put(&mut d, "path", parts);
        }
        if !self.md5sum.is_empty() {
            put(&mut d, "md5sum", self.md5sum.as_str());
        }
        d
    }
}

/// The `info` section of a torrent; its encoding is what the info-hash covers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InfoDict {
    pub name: String,
    pub length: u64,
    pub piece_length: u64,
    /// SHA-1 digests of every piece, concatenated in piece order
    pub pieces: Vec<u8>,
    pub private: bool,
    pub md5sum: String,
    pub files: Vec<FileDict>,
}

impl InfoDict {
    pub fn piece_count(&self) -> usize {
        self.pieces.len() / DIGEST_LEN
    }

    /// Build the info dictionary, leaving out every zero or empty field.
    pub fn to_value(&self) -> Value {
        let mut d = Dict::new();
        if self.piece_length != 0 {
            put(&mut d, "piece length", clamp_i64(self.piece_length));
        }
        if !self.pieces.is_empty() {
            put(&mut d, "pieces", self.pieces.clone());
        }
        if self.private {
            put(&mut d, "private", 1i64);
        }
        if !self.name.is_empty() {
            put(&mut d, "name", self.name.as_str());
        }
        if self.length != 0 {
            put(&mut d, "length", clamp_i64(self.length));
        }
        if !self.md5sum.is_empty() {
            put(&mut d, "md5sum", self.md5sum.as_str());
        }
        let files = self
            .files
            .iter()
            .map(FileDict::to_dict)
            .filter(|f| !f.is_empty())
            .map(Value::Dict)
            .collect::<Vec<_>>();
        if !files.is_empty() {
            put(&mut d, "files", files);
        }
        Value::Dict(d)
    }

    /// SHA-1 of the encoded dictionary. An empty info dict hashes as `de`.
    pub fn info_hash(&self) -> InfoHash {
        InfoHash(Sha1::digest(bencode::encode(&self.to_value())).into())
    }
}

/// SHA-1 of the bencoded info dictionary.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct InfoHash(pub [u8; DIGEST_LEN]);

impl InfoHash {
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for InfoHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for InfoHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InfoHash({})", self.to_hex())
    }
}

/// A complete torrent file with the segment manifest extension.
#[derive(Debug, Clone, Default)]
pub struct MetaInfo {
    pub info: InfoDict,
    pub announce: String,
    pub announce_list: Vec<Vec<String>>,
    /// Seconds since the Unix epoch
    pub creation_date: Option<i64>,
    pub comment: String,
    pub created_by: String,
    pub encoding: String,
    pub manifest: Manifest,
}

impl MetaInfo {
    /// Info-hash of [`MetaInfo::info`]. Clients derive it themselves, so it is
    /// never written into the file.
    pub fn info_hash(&self) -> InfoHash {
        self.info.info_hash()
    }

    pub fn to_value(&self) -> Value {
        let mut mi = Dict::new();
        let info = self.info.to_value();
        if info.as_dict().is_some_and(|d| !d.is_empty()) {
            put(&mut mi, "info", info);
        }
        if !self.announce.is_empty() {
            put(&mut mi, "announce", self.announce.as_str());
        }
        if !self.announce_list.is_empty() {
            let tiers = self
                .announce_list
                .iter()
                .map(|tier| Value::List(tier.iter().map(|url| Value::string(url)).collect()))
                .collect::<Vec<_>>();
            put(&mut mi, "announce-list", tiers);
        }
        if let Some(date) = self.creation_date {
            put(&mut mi, "creation date", date);
        }
        if !self.comment.is_empty() {
            put(&mut mi, "comment", self.comment.as_str());
        }
        if !self.created_by.is_empty() {
            put(&mut mi, "created by", self.created_by.as_str());
        }
        if !self.encoding.is_empty() {
            put(&mut mi, "encoding", self.encoding.as_str());
        }
        put(&mut mi, "manifest", self.manifest.to_value());
        Value::Dict(mi)
    }

    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        bencode::encode_to(&self.to_value(), w)
    }
}
