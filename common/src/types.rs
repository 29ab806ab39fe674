//! Core value types: symbols and fixed-point prices/quantities

use crate::constants::fixed_point::{SCALE_8, SCALE_8_DIGITS};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign};

/// Trading symbol, e.g. `BTCUSDT`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Symbol(String);

impl Symbol {
    /// Create a new symbol
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Symbol name
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Symbol {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// Clamp a scaled float into the i64 range before the cast.
fn to_fixed(value: f64) -> i64 {
    const MAX_SAFE: f64 = 9_223_372_036_854_775_807.0;
    const MIN_SAFE: f64 = -9_223_372_036_854_775_808.0;

    #[allow(clippy::cast_precision_loss)]
    let scaled = (value * SCALE_8 as f64).round();
    if scaled.is_nan() {
        0
    } else if scaled >= MAX_SAFE {
        i64::MAX
    } else if scaled <= MIN_SAFE {
        i64::MIN
    } else {
        #[allow(clippy::cast_possible_truncation)]
        let result = scaled as i64;
        result
    }
}

#[allow(clippy::cast_precision_loss)]
fn from_fixed(value: i64) -> f64 {
    value as f64 / SCALE_8 as f64
}

fn fmt_fixed(value: i64, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let sign = if value < 0 { "-" } else { "" };
    let whole = (value / SCALE_8).abs();
    let frac = (value % SCALE_8).abs();
    write!(f, "{sign}{whole}.{frac:0width$}", width = SCALE_8_DIGITS)
}

/// Price stored as i64 ticks (1 tick = 0.00000001)
///
/// Zero doubles as the "unset" marker inside the OHLCV accumulator, so traded
/// prices are expected to be strictly positive.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Px(i64);

impl Px {
    /// Zero price
    pub const ZERO: Self = Self(0);

    /// Create a price from a float (external boundary only)
    #[must_use]
    pub fn new(value: f64) -> Self {
        Self(to_fixed(value))
    }

    /// Create from i64 ticks
    #[must_use]
    pub const fn from_i64(ticks: i64) -> Self {
        Self(ticks)
    }

    /// Create from whole units
    #[must_use]
    pub const fn from_units(units: i64) -> Self {
        Self(units * SCALE_8)
    }

    /// Get price as i64 ticks
    #[must_use]
    pub const fn as_i64(&self) -> i64 {
        self.0
    }

    /// Get price as f64 for external APIs only
    #[must_use]
    pub fn as_f64(&self) -> f64 {
        from_fixed(self.0)
    }

    /// Check if the price is zero (unset)
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Notional value of `qty` at this price
    #[must_use]
    pub fn notional(self, qty: Qty) -> Qty {
        let wide = i128::from(self.0) * i128::from(qty.0) / i128::from(SCALE_8);
        Qty(i64::try_from(wide).unwrap_or(if wide < 0 { i64::MIN } else { i64::MAX }))
    }
}

impl fmt::Display for Px {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_fixed(self.0, f)
    }
}

/// Quantity stored as i64 units (1 unit = 0.00000001)
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Qty(i64);

impl Qty {
    /// Zero quantity
    pub const ZERO: Self = Self(0);

    /// Create a quantity from a float (external boundary only)
    #[must_use]
    pub fn new(value: f64) -> Self {
        Self(to_fixed(value))
    }

    /// Create from i64 units
    #[must_use]
    pub const fn from_i64(units: i64) -> Self {
        Self(units)
    }

    /// Create from whole units
    #[must_use]
    pub const fn from_units(units: i64) -> Self {
        Self(units * SCALE_8)
    }

    /// Get quantity as i64 units
    #[must_use]
    pub const fn as_i64(&self) -> i64 {
        self.0
    }

    /// Get quantity as f64 for external APIs only
    #[must_use]
    pub fn as_f64(&self) -> f64 {
        from_fixed(self.0)
    }

    /// Check if quantity is zero
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Add for Qty {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }
}

impl AddAssign for Qty {
    fn add_assign(&mut self, other: Self) {
        *self = *self + other;
    }
}

impl fmt::Display for Qty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_fixed(self.0, f)
    }
}
