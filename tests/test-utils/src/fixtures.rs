//! Test fixtures for common test data

use chrono::{DateTime, TimeZone, Utc};
use common::Symbol;
use rstest::*;

/// Default symbol under test
pub const TEST_SYMBOL: &str = "BTCUSDT";

/// Standard test symbol
#[fixture]
pub fn symbol() -> Symbol {
    Symbol::from(TEST_SYMBOL)
}

/// Monday midnight UTC, a boundary of every supported interval
#[fixture]
pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or_default()
}
