use dashtorrent::pieces::{DIGEST_LEN, HashError, PiecePlan, hash_pieces, piece_count};
use sha1::{Digest, Sha1};
use std::fs::File;
use std::io::Write;
use std::num::NonZeroUsize;

fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| ((i * 2654435761) >> 7) as u8).collect()
}

fn workers(n: usize) -> NonZeroUsize {
    NonZeroUsize::new(n).unwrap()
}

#[test]
fn pool_size_does_not_change_digests() {
    let data = pattern(1_000_003);
    let mut f = tempfile::tempfile().unwrap();
    f.write_all(&data).unwrap();

    let len = data.len() as u64;
    let pl = 16 * 1024;
    let one = hash_pieces(&f, len, pl, workers(1)).unwrap();
    let eight = hash_pieces(&f, len, pl, workers(8)).unwrap();

    assert_eq!(one, eight);
    assert_eq!(one.len(), piece_count(len, pl) as usize * DIGEST_LEN);
}

#[test]
fn last_piece_is_short() {
    let data = pattern(3 * 16384 + 100);
    let sums = hash_pieces(&data, data.len() as u64, 16384, workers(3)).unwrap();
    assert_eq!(sums.len(), 4 * DIGEST_LEN);

    let tail: [u8; DIGEST_LEN] = Sha1::digest(&data[3 * 16384..]).into();
    assert_eq!(&sums[3 * DIGEST_LEN..], &tail);
}

#[test]
fn more_workers_than_pieces() {
    let data = pattern(100);
    let sums = hash_pieces(&data, 100, 16384, workers(64)).unwrap();
    let whole: [u8; DIGEST_LEN] = Sha1::digest(&data).into();
    assert_eq!(sums, whole.to_vec());
}

#[test]
fn empty_payload_has_no_pieces() {
    let sums = hash_pieces(&[0u8; 0][..], 0, 16384, workers(4)).unwrap();
    assert!(sums.is_empty());
}

#[test]
fn read_failure_aborts_pass() {
    // the file is shorter than the length we claim
    let mut f = tempfile::tempfile().unwrap();
    f.write_all(&pattern(20_000)).unwrap();

    let err = hash_pieces(&f, 200_000, 16384, workers(4)).unwrap_err();
    assert!(matches!(err, HashError::Read { .. }), "{err}");
}

#[test]
fn zero_piece_length_is_rejected() {
    let err = hash_pieces(&pattern(10), 10, 0, workers(1)).unwrap_err();
    assert!(matches!(err, HashError::ZeroPieceLength));
}

#[test]
fn planned_layout_for_real_file() {
    let data = pattern(5 * 1024 * 1024 + 17);
    let path = tempfile::NamedTempFile::new().unwrap();
    std::fs::write(path.path(), &data).unwrap();

    let f = File::open(path.path()).unwrap();
    let len = f.metadata().unwrap().len();
    let pl = PiecePlan::default().piece_length(len);
    assert_eq!(pl, 16384);

    let sums = hash_pieces(&f, len, pl, workers(4)).unwrap();
    assert_eq!(sums.len() as u64, DIGEST_LEN as u64 * len.div_ceil(pl));
}
