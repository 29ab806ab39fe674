//! Kline aggregator configuration

use crate::error::{AggregatorError, AggregatorResult};
use crate::store::DEFAULT_WINDOW_CAPACITY;
use common::Interval;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Kline aggregator configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregatorConfig {
    /// Symbol to aggregate
    pub symbol: String,

    /// Finest interval produced (trade mode) or consumed (kline mode)
    pub base_interval: Interval,

    /// Intervals to roll up to; each must be a multiple of `base_interval`
    pub intervals: Vec<Interval>,

    /// Build base klines from trades instead of consuming closed klines
    pub use_market_trade: bool,

    /// Klines kept per interval by the market data store
    pub window_capacity: usize,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            symbol: "BTCUSDT".to_string(),
            base_interval: Interval::M1,
            intervals: vec![Interval::M5, Interval::M15, Interval::H1],
            use_market_trade: false,
            window_capacity: DEFAULT_WINDOW_CAPACITY,
        }
    }
}

impl AggregatorConfig {
    /// Load a JSON configuration file; missing fields take their defaults
    pub fn from_file(path: &Path) -> AggregatorResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        Ok(config)
    }

    /// Check the configuration can drive an aggregator
    pub fn validate(&self) -> AggregatorResult<()> {
        if self.symbol.trim().is_empty() {
            return Err(AggregatorError::InvalidConfig("symbol is empty".to_string()));
        }
        if self.window_capacity == 0 {
            return Err(AggregatorError::InvalidConfig(
                "window_capacity must be positive".to_string(),
            ));
        }
        if let Some(&interval) = self
            .intervals
            .iter()
            .find(|interval| !interval.is_multiple_of(self.base_interval))
        {
            return Err(AggregatorError::NotAMultiple {
                interval,
                base: self.base_interval,
            });
        }
        Ok(())
    }
}
