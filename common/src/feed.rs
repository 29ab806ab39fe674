//! Collaborator contracts between the aggregator, its market data source and
//! its downstream consumer

use crate::market::{Kline, Trade};
use std::sync::Arc;

/// Callback invoked with every closed kline delivered by a stream
pub type KlineHandler = Box<dyn Fn(Kline) + Send + Sync>;

/// Callback invoked with every trade delivered by a stream
pub type TradeHandler = Box<dyn Fn(Trade) + Send + Sync>;

/// Source of market events
///
/// A consumer registers callbacks and the stream invokes them from its own
/// delivery context.
pub trait MarketDataStream: Send + Sync {
    /// Register a callback for closed klines
    fn on_kline_closed(&self, handler: KlineHandler);

    /// Register a callback for market trades
    fn on_market_trade(&self, handler: TradeHandler);
}

/// Downstream consumer of finalized klines
///
/// Delivery is fire-and-forget: nothing flows back to the producer.
pub trait KlineSink: Send + Sync {
    /// Accept a finalized kline
    fn add_kline(&self, kline: Kline);
}

impl<T: KlineSink + ?Sized> KlineSink for Arc<T> {
    fn add_kline(&self, kline: Kline) {
        (**self).add_kline(kline);
    }
}
