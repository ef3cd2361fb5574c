#![allow(dead_code)]

/// A plain box: 32-bit size, tag, payload.
pub fn mp4_box(tag: &[u8; 4], payload: &[u8]) -> Vec<u8> {
    let mut v = Vec::with_capacity(8 + payload.len());
    v.extend_from_slice(&(8 + payload.len() as u32).to_be_bytes());
    v.extend_from_slice(tag);
    v.extend_from_slice(payload);
    v
}

/// Version 0 `sidx` box with a single reference.
pub fn sidx_box(timescale: u32, duration: u32) -> Vec<u8> {
    let mut p = vec![0, 0, 0, 0]; // version, flags
    p.extend_from_slice(&1u32.to_be_bytes()); // reference_id
    p.extend_from_slice(&timescale.to_be_bytes());
    p.extend_from_slice(&0u32.to_be_bytes()); // earliest_presentation_time
    p.extend_from_slice(&0u32.to_be_bytes()); // first_offset
    p.extend_from_slice(&0u16.to_be_bytes()); // reserved
    p.extend_from_slice(&1u16.to_be_bytes()); // reference_count
    p.extend_from_slice(&0u32.to_be_bytes()); // reference type + size
    p.extend_from_slice(&duration.to_be_bytes());
    p.extend_from_slice(&0x9000_0000u32.to_be_bytes()); // SAP
    mp4_box(b"sidx", &p)
}

pub fn ftyp_box() -> Vec<u8> {
    let mut p = Vec::new();
    p.extend_from_slice(b"iso6");
    p.extend_from_slice(&512u32.to_be_bytes());
    p.extend_from_slice(b"dash");
    mp4_box(b"ftyp", &p)
}

/// A DASH-style file: `ftyp`, then per fragment a top-level `sidx`, a
/// fragment `sidx`, a `moof` and an `mdat`. The `mdat` boxes are padded so
/// the whole file is `total_len` bytes.
///
/// Returns the bytes and the offset at which each fragment starts.
pub fn dash_file(timescale: u32, durations: &[u32], total_len: usize) -> (Vec<u8>, Vec<u64>) {
    let mut data = ftyp_box();
    let per_fragment = (total_len - data.len()) / durations.len();
    let mut starts = Vec::new();

    for (i, &d) in durations.iter().enumerate() {
        let start = data.len();
        starts.push(start as u64);
        data.extend(sidx_box(timescale, d));
        data.extend(sidx_box(timescale, d));
        data.extend(mp4_box(b"moof", &[0u8; 8]));

        let end = if i + 1 == durations.len() {
            total_len
        } else {
            start + per_fragment
        };
        let mdat_payload = end - data.len() - 8;
        data.extend_from_slice(&(8 + mdat_payload as u32).to_be_bytes());
        data.extend_from_slice(b"mdat");
        data.resize(end, (i as u8).wrapping_mul(31).wrapping_add(1));
    }

    assert_eq!(data.len(), total_len);
    (data, starts)
}
