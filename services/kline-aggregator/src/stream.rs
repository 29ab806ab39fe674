//! In-process market data stream

use common::{Kline, KlineHandler, MarketDataStream, Trade, TradeHandler};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::trace;

type SharedKlineHandler = Arc<dyn Fn(Kline) + Send + Sync>;
type SharedTradeHandler = Arc<dyn Fn(Trade) + Send + Sync>;

/// Callback registry implementing [`MarketDataStream`].
///
/// Whoever owns the connection to the market pushes events with
/// [`StandardStream::emit_kline_closed`] and
/// [`StandardStream::emit_market_trade`]; every registered handler runs on the
/// caller's thread, in registration order.
#[derive(Default)]
pub struct StandardStream {
    kline_closed_handlers: RwLock<Vec<SharedKlineHandler>>,
    market_trade_handlers: RwLock<Vec<SharedTradeHandler>>,
}

impl std::fmt::Debug for StandardStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StandardStream")
            .field("kline_closed_handlers", &self.kline_closed_handlers.read().len())
            .field("market_trade_handlers", &self.market_trade_handlers.read().len())
            .finish()
    }
}

impl StandardStream {
    /// Create a stream with no handlers
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver a closed kline to every kline handler
    pub fn emit_kline_closed(&self, kline: &Kline) {
        // handlers may register more handlers; don't hold the lock while calling
        let handlers = self.kline_closed_handlers.read().clone();
        trace!("emitting {} {} kline to {} handlers", kline.symbol, kline.interval, handlers.len());
        for handler in handlers {
            handler(kline.clone());
        }
    }

    /// Deliver a trade to every trade handler
    pub fn emit_market_trade(&self, trade: &Trade) {
        let handlers = self.market_trade_handlers.read().clone();
        for handler in handlers {
            handler(trade.clone());
        }
    }

    /// Number of registered kline handlers
    #[must_use]
    pub fn kline_handler_count(&self) -> usize {
        self.kline_closed_handlers.read().len()
    }

    /// Number of registered trade handlers
    #[must_use]
    pub fn trade_handler_count(&self) -> usize {
        self.market_trade_handlers.read().len()
    }
}

impl MarketDataStream for StandardStream {
    fn on_kline_closed(&self, handler: KlineHandler) {
        self.kline_closed_handlers.write().push(Arc::from(handler));
    }

    fn on_market_trade(&self, handler: TradeHandler) {
        self.market_trade_handlers.write().push(Arc::from(handler));
    }
}
