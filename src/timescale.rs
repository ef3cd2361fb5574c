//! Conversion of media-timescale tick counts into wall-clock durations.

use crate::parser::{ParseError, Result};
use std::time::Duration;

pub const NANOS_PER_SEC: u64 = 1_000_000_000;

/// Convert `ticks` expressed in `timescale` units per second into a [`Duration`].
///
/// The product `ticks * 1e9` is computed in 64 bits when it fits and in 128
/// bits otherwise; both paths floor to the same whole nanosecond.
pub fn scale_ticks(ticks: u64, timescale: u32) -> Result<Duration> {
    if timescale == 0 {
        return Err(ParseError::ZeroTimescale);
    }
    Ok(match ticks.checked_mul(NANOS_PER_SEC) {
        Some(nanos) => Duration::from_nanos(nanos / timescale as u64),
        None => scale_ticks_wide(ticks, timescale),
    })
}

fn scale_ticks_wide(ticks: u64, timescale: u32) -> Duration {
    let nanos = ticks as u128 * NANOS_PER_SEC as u128 / timescale as u128;
    // nanos / 1e9 <= ticks, so the seconds part always fits in u64
    let secs = (nanos / NANOS_PER_SEC as u128) as u64;
    let subsec = (nanos % NANOS_PER_SEC as u128) as u32;
    Duration::new(secs, subsec)
}

/// Whole milliseconds of `d`, saturating at `u64::MAX`.
pub fn whole_millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
