//! OHLCV accumulator for trade-driven aggregation

use common::{Px, Qty, Symbol, Trade};
use parking_lot::Mutex;

/// OHLCV values taken out of the accumulator at a bucket boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OhlcvSnapshot {
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
    pub trades: u64,
}

#[derive(Debug, Default)]
struct OhlcvState {
    open: Px,
    high: Px,
    low: Px,
    close: Px,
    volume: Qty,
    quote_volume: Qty,
    trades: u64,
    last_price: Px,
}

/// Accumulates trades of one symbol into the current base-interval bucket.
///
/// All fields live behind a single mutex shared by the trade handler and the
/// flush scheduler. A zero price means "unset", which is why traded prices
/// must be strictly positive.
#[derive(Debug)]
pub struct OhlcvAccumulator {
    symbol: Symbol,
    state: Mutex<OhlcvState>,
}

impl OhlcvAccumulator {
    /// Create an empty accumulator tracking `symbol`
    #[must_use]
    pub fn new(symbol: Symbol) -> Self {
        Self {
            symbol,
            state: Mutex::new(OhlcvState::default()),
        }
    }

    /// Tracked symbol
    #[must_use]
    pub const fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    /// Fold a trade into the current bucket.
    ///
    /// Trades for other symbols are ignored; a stream may carry several.
    pub fn observe(&self, trade: &Trade) {
        if trade.symbol != self.symbol {
            return;
        }
        let price = trade.price;
        let mut state = self.state.lock();
        state.last_price = price;
        state.close = price;
        if price > state.high {
            state.high = price;
        }
        if state.low.is_zero() || price < state.low {
            state.low = price;
        }
        if state.open.is_zero() {
            state.open = price;
        }
        state.volume += trade.quantity;
        state.quote_volume += trade.quote_quantity;
        state.trades += 1;
    }

    /// Take the current bucket and start a new one.
    ///
    /// A bucket without trades yields a flat snapshot at the last traded
    /// price with zero volume.
    pub fn flush_and_reset(&self) -> OhlcvSnapshot {
        let mut state = self.state.lock();
        if state.close.is_zero() {
            let price = state.last_price;
            return OhlcvSnapshot {
                open: price,
                high: price,
                low: price,
                close: price,
                volume: Qty::ZERO,
                quote_volume: Qty::ZERO,
                trades: 0,
            };
        }

        let snapshot = OhlcvSnapshot {
            open: state.open,
            high: state.high,
            low: state.low,
            close: state.close,
            volume: state.volume,
            quote_volume: state.quote_volume,
            trades: state.trades,
        };
        *state = OhlcvState {
            last_price: state.last_price,
            ..OhlcvState::default()
        };
        snapshot
    }

    /// Last traded price, zero before the first trade
    #[must_use]
    pub fn last_price(&self) -> Px {
        self.state.lock().last_price
    }
}
