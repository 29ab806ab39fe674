//! Shared constants

/// Fixed-point arithmetic constants
pub mod fixed_point {
    /// Scale factor for prices and quantities (8 decimal places)
    pub const SCALE_8: i64 = 100_000_000;
    /// Number of fractional digits carried by `SCALE_8`
    pub const SCALE_8_DIGITS: usize = 8;
}

/// Time constants
pub mod time {
    /// Seconds per minute
    pub const SECS_PER_MIN: i64 = 60;
    /// Seconds per hour
    pub const SECS_PER_HOUR: i64 = SECS_PER_MIN * 60;
    /// Seconds per day
    pub const SECS_PER_DAY: i64 = SECS_PER_HOUR * 24;
    /// Seconds per week
    pub const SECS_PER_WEEK: i64 = SECS_PER_DAY * 7;
    /// Seconds from 0001-01-01 (a Monday) to the Unix epoch; interval
    /// boundaries are counted from the former
    pub const SECS_CE_TO_UNIX_EPOCH: i64 = 719_162 * SECS_PER_DAY;
}
