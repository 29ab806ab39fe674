//! Market data types: intervals, klines and trades

use crate::constants::time::{SECS_PER_DAY, SECS_PER_HOUR, SECS_PER_MIN, SECS_PER_WEEK};
use crate::types::{Px, Qty, Symbol};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error returned when an interval string is not recognised
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown interval: {0:?}")]
pub struct ParseIntervalError(pub String);

/// Kline interval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Interval {
    /// 1 second bars
    #[serde(rename = "1s")]
    S1,
    /// 1 minute bars
    #[serde(rename = "1m")]
    M1,
    /// 3 minute bars
    #[serde(rename = "3m")]
    M3,
    /// 5 minute bars
    #[serde(rename = "5m")]
    M5,
    /// 15 minute bars
    #[serde(rename = "15m")]
    M15,
    /// 30 minute bars
    #[serde(rename = "30m")]
    M30,
    /// 1 hour bars
    #[serde(rename = "1h")]
    H1,
    /// 2 hour bars
    #[serde(rename = "2h")]
    H2,
    /// 4 hour bars
    #[serde(rename = "4h")]
    H4,
    /// 6 hour bars
    #[serde(rename = "6h")]
    H6,
    /// 12 hour bars
    #[serde(rename = "12h")]
    H12,
    /// Daily bars
    #[serde(rename = "1d")]
    D1,
    /// 3 day bars
    #[serde(rename = "3d")]
    D3,
    /// Weekly bars
    #[serde(rename = "1w")]
    W1,
}

impl Interval {
    /// Every supported interval, finest first
    pub const ALL: [Self; 14] = [
        Self::S1,
        Self::M1,
        Self::M3,
        Self::M5,
        Self::M15,
        Self::M30,
        Self::H1,
        Self::H2,
        Self::H4,
        Self::H6,
        Self::H12,
        Self::D1,
        Self::D3,
        Self::W1,
    ];

    /// Get duration in seconds
    #[must_use]
    pub const fn duration_seconds(&self) -> i64 {
        match self {
            Self::S1 => 1,
            Self::M1 => SECS_PER_MIN,
            Self::M3 => 3 * SECS_PER_MIN,
            Self::M5 => 5 * SECS_PER_MIN,
            Self::M15 => 15 * SECS_PER_MIN,
            Self::M30 => 30 * SECS_PER_MIN,
            Self::H1 => SECS_PER_HOUR,
            Self::H2 => 2 * SECS_PER_HOUR,
            Self::H4 => 4 * SECS_PER_HOUR,
            Self::H6 => 6 * SECS_PER_HOUR,
            Self::H12 => 12 * SECS_PER_HOUR,
            Self::D1 => SECS_PER_DAY,
            Self::D3 => 3 * SECS_PER_DAY,
            Self::W1 => SECS_PER_WEEK,
        }
    }

    /// Get chrono duration
    #[must_use]
    pub fn to_duration(&self) -> Duration {
        Duration::seconds(self.duration_seconds())
    }

    /// Get std duration, for timers
    #[must_use]
    pub fn to_std(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.duration_seconds().unsigned_abs())
    }

    /// Check whether this interval is a whole multiple of `base`
    #[must_use]
    pub const fn is_multiple_of(&self, base: Self) -> bool {
        self.duration_seconds() % base.duration_seconds() == 0
    }

    /// Canonical short name, e.g. `5m`
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::S1 => "1s",
            Self::M1 => "1m",
            Self::M3 => "3m",
            Self::M5 => "5m",
            Self::M15 => "15m",
            Self::M30 => "30m",
            Self::H1 => "1h",
            Self::H2 => "2h",
            Self::H4 => "4h",
            Self::H6 => "6h",
            Self::H12 => "12h",
            Self::D1 => "1d",
            Self::D3 => "3d",
            Self::W1 => "1w",
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Interval {
    type Err = ParseIntervalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|interval| interval.as_str() == s)
            .ok_or_else(|| ParseIntervalError(s.to_string()))
    }
}

/// OHLCV kline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Kline {
    /// Symbol
    pub symbol: Symbol,
    /// Interval
    pub interval: Interval,
    /// Open time
    pub start_time: DateTime<Utc>,
    /// Close time
    pub end_time: DateTime<Utc>,
    /// Open price
    pub open: Px,
    /// High price
    pub high: Px,
    /// Low price
    pub low: Px,
    /// Close price
    pub close: Px,
    /// Base asset volume
    pub volume: Qty,
    /// Quote asset volume
    pub quote_volume: Qty,
    /// Number of trades
    pub number_of_trades: u64,
    /// Whether the kline is final
    pub closed: bool,
}

impl Kline {
    /// Create an empty, open kline spanning one interval from `start_time`
    #[must_use]
    pub fn new(symbol: Symbol, interval: Interval, start_time: DateTime<Utc>) -> Self {
        Self {
            symbol,
            interval,
            start_time,
            end_time: start_time + interval.to_duration(),
            open: Px::ZERO,
            high: Px::ZERO,
            low: Px::ZERO,
            close: Px::ZERO,
            volume: Qty::ZERO,
            quote_volume: Qty::ZERO,
            number_of_trades: 0,
            closed: false,
        }
    }

    /// Overwrite every field with the values of `other`
    pub fn set_from(&mut self, other: &Self) {
        self.clone_from(other);
    }

    /// Fold a later kline into this one.
    ///
    /// The open price and start time stay as they are; the end time and close
    /// come from `other`, the extremes widen and the volumes add up.
    pub fn merge(&mut self, other: &Self) {
        self.end_time = other.end_time;
        self.close = other.close;
        self.high = self.high.max(other.high);
        self.low = self.low.min(other.low);
        self.volume += other.volume;
        self.quote_volume += other.quote_volume;
        self.number_of_trades += other.number_of_trades;
        self.closed = other.closed;
    }

    /// Check the OHLCV invariants
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.high >= self.open.max(self.close)
            && self.low <= self.open.min(self.close)
            && self.volume >= Qty::ZERO
            && self.quote_volume >= Qty::ZERO
    }
}

/// Trade print from the market data stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    /// Exchange trade id
    pub id: u64,
    /// Symbol
    pub symbol: Symbol,
    /// Trade price
    pub price: Px,
    /// Base asset size
    pub quantity: Qty,
    /// Quote asset notional
    pub quote_quantity: Qty,
    /// Trade time
    pub time: DateTime<Utc>,
}

impl Trade {
    /// Create a trade, deriving the quote quantity from price and size
    #[must_use]
    pub fn new(symbol: Symbol, price: Px, quantity: Qty, time: DateTime<Utc>) -> Self {
        Self {
            id: 0,
            symbol,
            price,
            quantity,
            quote_quantity: price.notional(quantity),
            time,
        }
    }
}
