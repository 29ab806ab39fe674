//! Wall-clock boundary arithmetic
//!
//! Boundaries are exact multiples of a period counted from 0001-01-01 UTC, so
//! a `1d` boundary is UTC midnight and a `1w` boundary is a Monday. The wait
//! for the first scheduler tick is the exception: it is measured from the
//! Unix epoch. Periods that are zero or too large for nanosecond arithmetic
//! have no boundaries.

use chrono::{DateTime, Duration, Utc};
use common::constants::time::SECS_CE_TO_UNIX_EPOCH;

const NANOS_CE_TO_UNIX_EPOCH: i128 = SECS_CE_TO_UNIX_EPOCH as i128 * 1_000_000_000;

fn period_nanos(period: Duration) -> Option<i64> {
    period.num_nanoseconds().filter(|nanos| *nanos > 0)
}

/// Nanoseconds of `t` past the last boundary of `period`, and the nanosecond
/// timestamp of that boundary
fn split(t: DateTime<Utc>, period: Duration) -> Option<(i128, i128)> {
    let p = i128::from(period_nanos(period)?);
    let since_ce = i128::from(t.timestamp_nanos_opt()?) + NANOS_CE_TO_UNIX_EPOCH;
    let rem = since_ce.rem_euclid(p);
    Some((rem, since_ce - rem - NANOS_CE_TO_UNIX_EPOCH))
}

/// Time left from `now` until the next boundary of `period`.
///
/// Measured from the Unix epoch. When `now` already sits on a boundary the
/// full period is returned, so a timer armed with the result always fires on
/// the following boundary.
#[must_use]
pub fn time_until_next_boundary(now: DateTime<Utc>, period: Duration) -> Duration {
    match (period_nanos(period), now.timestamp_nanos_opt()) {
        (Some(p), Some(t)) => Duration::nanoseconds(p - t.rem_euclid(p)),
        _ => period,
    }
}

/// Round `t` to the nearest boundary of `period`; halfway rounds up.
#[must_use]
pub fn round_to_boundary(t: DateTime<Utc>, period: Duration) -> DateTime<Utc> {
    let (Some((rem, floor)), Some(p)) = (split(t, period), period_nanos(period)) else {
        return t;
    };
    let p = i128::from(p);
    let rounded = if rem >= p - rem { floor + p } else { floor };
    i64::try_from(rounded).map_or(t, DateTime::from_timestamp_nanos)
}

/// Whether `t` is itself a boundary of `period`
#[must_use]
pub fn is_boundary(t: DateTime<Utc>, period: Duration) -> bool {
    split(t, period).is_some_and(|(rem, _)| rem == 0)
}
