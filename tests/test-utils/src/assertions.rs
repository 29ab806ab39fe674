//! Custom assertions for testing

use common::constants::time::SECS_CE_TO_UNIX_EPOCH;
use common::{Interval, Kline, Px, Qty};

/// Assert low <= open, close <= high on a kline with at least one price
pub fn assert_ohlc_consistent(kline: &Kline) {
    assert!(
        kline.is_consistent(),
        "Inconsistent OHLC for {} {} at {}: o={} h={} l={} c={}",
        kline.symbol,
        kline.interval,
        kline.start_time,
        kline.open,
        kline.high,
        kline.low,
        kline.close
    );
}

/// Assert a kline spans exactly one `interval` starting on its boundary
pub fn assert_aligned(kline: &Kline, interval: Interval) {
    // boundaries count from 0001-01-01, not the Unix epoch
    let since_ce = kline.start_time.timestamp() + SECS_CE_TO_UNIX_EPOCH;
    assert_eq!(kline.interval, interval, "Unexpected interval");
    assert_eq!(
        kline.end_time - kline.start_time,
        interval.to_duration(),
        "Kline at {} does not span one {}",
        kline.start_time,
        interval
    );
    assert_eq!(
        since_ce.rem_euclid(interval.duration_seconds()),
        0,
        "Kline start {} is not on a {} boundary",
        kline.start_time,
        interval
    );
}

/// Assert a kline's prices and volume
pub fn assert_ohlcv(kline: &Kline, open: f64, high: f64, low: f64, close: f64, volume: f64) {
    assert_eq!(
        (kline.open, kline.high, kline.low, kline.close, kline.volume),
        (
            Px::new(open),
            Px::new(high),
            Px::new(low),
            Px::new(close),
            Qty::new(volume)
        ),
        "OHLCV mismatch for {} {} at {}",
        kline.symbol,
        kline.interval,
        kline.start_time
    );
}

/// Assert a flat kline with no trades at `price`
pub fn assert_flat(kline: &Kline, price: f64) {
    assert_ohlcv(kline, price, price, price, price, 0.0);
    assert_eq!(kline.number_of_trades, 0, "Flat kline should carry no trades");
}
