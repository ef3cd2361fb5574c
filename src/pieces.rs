//! Piece sizing and parallel SHA-1 hashing of torrent payloads.

use crossbeam::channel;
use sha1::{Digest, Sha1};
use std::fs::File;
use std::io;
use std::num::NonZeroUsize;
use std::thread;
use tracing::debug;

/// Size of one SHA-1 piece digest.
pub const DIGEST_LEN: usize = 20;

/// Smallest piece length handed out; BitTorrent clients request 16 KiB blocks.
pub const MIN_PIECE_LENGTH: u64 = 16 * 1024;
pub const TARGET_PIECE_COUNT_LOG2: u32 = 10;
pub const TARGET_PIECE_COUNT_MIN: u64 = 1 << TARGET_PIECE_COUNT_LOG2;
/// Piece counts stay below this whenever the floor allows it.
pub const TARGET_PIECE_COUNT_MAX: u64 = TARGET_PIECE_COUNT_MIN << 1;

/// Bounds used to choose a piece length from the payload size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PiecePlan {
    min_piece_length: u64,
    max_piece_count: u64,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PlanError {
    #[error("minimum piece length {0} is not a non-zero power of two")]
    InvalidFloor(u64),
    #[error("piece count bound must be non-zero")]
    ZeroBound,
}

impl Default for PiecePlan {
    fn default() -> Self {
        Self {
            min_piece_length: MIN_PIECE_LENGTH,
            max_piece_count: TARGET_PIECE_COUNT_MAX,
        }
    }
}

impl PiecePlan {
    /// `min_piece_length` is the power of two to start doubling from;
    /// `max_piece_count` is the exclusive upper bound on the piece count.
    pub fn new(min_piece_length: u64, max_piece_count: u64) -> Result<Self, PlanError> {
        if !min_piece_length.is_power_of_two() {
            return Err(PlanError::InvalidFloor(min_piece_length));
        }
        if max_piece_count == 0 {
            return Err(PlanError::ZeroBound);
        }
        Ok(Self {
            min_piece_length,
            max_piece_count,
        })
    }

    pub fn min_piece_length(&self) -> u64 {
        self.min_piece_length
    }

    pub fn max_piece_count(&self) -> u64 {
        self.max_piece_count
    }

    /// Start at the floor and double while `total_length / piece_length` reaches the bound.
    ///
    /// Doubling stops at the largest `u64` power of two.
    pub fn piece_length(&self, total_length: u64) -> u64 {
        const CEILING: u64 = 1 << 63;
        let mut piece_length = self.min_piece_length;
        while piece_length < CEILING && total_length / piece_length >= self.max_piece_count {
            piece_length <<= 1;
        }
        piece_length
    }
}

/// Number of pieces needed to cover `total_length` bytes.
pub fn piece_count(total_length: u64, piece_length: u64) -> u64 {
    total_length.div_ceil(piece_length)
}

/// A byte source that supports reads at explicit offsets from several threads.
pub trait PieceSource: Sync {
    fn read_exact_at(&self, buf: &mut [u8], offset: u64) -> io::Result<()>;
}

impl PieceSource for File {
    #[cfg(unix)]
    fn read_exact_at(&self, buf: &mut [u8], offset: u64) -> io::Result<()> {
        std::os::unix::fs::FileExt::read_exact_at(self, buf, offset)
    }

    #[cfg(windows)]
    fn read_exact_at(&self, mut buf: &mut [u8], mut offset: u64) -> io::Result<()> {
        use std::os::windows::fs::FileExt;
        while !buf.is_empty() {
            match self.seek_read(buf, offset) {
                Ok(0) => return Err(io::ErrorKind::UnexpectedEof.into()),
                Ok(n) => {
                    buf = &mut buf[n..];
                    offset += n as u64;
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}

impl PieceSource for [u8] {
    fn read_exact_at(&self, buf: &mut [u8], offset: u64) -> io::Result<()> {
        let start = usize::try_from(offset).map_err(|_| io::Error::from(io::ErrorKind::UnexpectedEof))?;
        let src = start
            .checked_add(buf.len())
            .and_then(|end| self.get(start..end))
            .ok_or(io::ErrorKind::UnexpectedEof)?;
        buf.copy_from_slice(src);
        Ok(())
    }
}

impl PieceSource for Vec<u8> {
    fn read_exact_at(&self, buf: &mut [u8], offset: u64) -> io::Result<()> {
        self.as_slice().read_exact_at(buf, offset)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum HashError {
    #[error("reading piece {index} at offset {offset}: {source}")]
    Read {
        index: u64,
        offset: u64,
        #[source]
        source: io::Error,
    },
    #[error("hash workers stopped after {received} of {expected} pieces")]
    Incomplete { expected: u64, received: u64 },
    #[error("piece length must be non-zero")]
    ZeroPieceLength,
}

#[derive(Debug, Clone, Copy)]
struct PieceTask {
    index: u64,
    offset: u64,
    len: usize,
}

type PieceResult = Result<(u64, [u8; DIGEST_LEN]), HashError>;

/// Default hashing pool size: the machine's available parallelism.
pub fn default_workers() -> NonZeroUsize {
    thread::available_parallelism().unwrap_or(NonZeroUsize::MIN)
}

/// Hash every `piece_length` chunk of `src` and return the digests
/// concatenated in piece order.
///
/// Pieces are read with positioned reads by a pool of `workers` threads; the
/// pool is joined before this returns. The first failed read aborts the pass.
pub fn hash_pieces<S: PieceSource + ?Sized>(
    src: &S,
    total_length: u64,
    piece_length: u64,
    workers: NonZeroUsize,
) -> Result<Vec<u8>, HashError> {
    if piece_length == 0 {
        return Err(HashError::ZeroPieceLength);
    }
    let count = piece_count(total_length, piece_length);
    let mut sums = vec![0u8; count as usize * DIGEST_LEN];
    if count == 0 {
        return Ok(sums);
    }

    let workers = workers.get().min(count as usize);
    debug!(pieces = count, piece_length, workers, "hashing pieces");

    let (task_tx, task_rx) = channel::unbounded::<PieceTask>();
    for index in 0..count {
        let offset = index * piece_length;
        let len = piece_length.min(total_length - offset) as usize;
        // the receiver is still alive here
        let _ = task_tx.send(PieceTask { index, offset, len });
    }
    drop(task_tx);

    let (result_tx, result_rx) = channel::bounded::<PieceResult>(workers * 2);

    thread::scope(|s| {
        // owned by the collector so an early return unblocks the workers
        let result_rx = result_rx;
        for _ in 0..workers {
            let tasks = task_rx.clone();
            let results = result_tx.clone();
            s.spawn(move || hash_worker(src, piece_length as usize, tasks, results));
        }
        drop(result_tx);

        let mut received = 0u64;
        while received < count {
            let (index, digest) = match result_rx.recv() {
                Ok(r) => r?,
                Err(_) => {
                    return Err(HashError::Incomplete {
                        expected: count,
                        received,
                    });
                }
            };
            let at = index as usize * DIGEST_LEN;
            sums[at..at + DIGEST_LEN].copy_from_slice(&digest);
            received += 1;
        }
        Ok(())
    })?;

    Ok(sums)
}

fn hash_worker<S: PieceSource + ?Sized>(
    src: &S,
    piece_length: usize,
    tasks: channel::Receiver<PieceTask>,
    results: channel::Sender<PieceResult>,
) {
    let mut buf = vec![0u8; piece_length];
    let mut hasher = Sha1::new();
    for task in tasks {
        let piece = &mut buf[..task.len];
        let result = match src.read_exact_at(piece, task.offset) {
            Ok(()) => {
                hasher.update(&*piece);
                Ok((task.index, hasher.finalize_reset().into()))
            }
            Err(source) => Err(HashError::Read {
                index: task.index,
                offset: task.offset,
                source,
            }),
        };
        let failed = result.is_err();
        // a closed channel means the collector gave up
        if results.send(result).is_err() || failed {
            return;
        }
    }
}
