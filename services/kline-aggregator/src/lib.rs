//! Kline Aggregator
//!
//! Re-buckets one symbol's market data into klines at coarser intervals:
//! - base-interval klines built from trades, flushed on wall-clock boundaries
//! - or closed base-interval klines taken straight from the market stream
//! - every base kline rolled up into each subscribed interval, emitted to the
//!   sink when the interval's boundary is reached

pub mod aggregators;
pub mod boundary;
pub mod config;
pub mod error;
pub mod scheduler;
pub mod store;
pub mod stream;

pub use aggregators::{Delivery, OhlcvAccumulator, OhlcvSnapshot, RollupEngine};
pub use config::AggregatorConfig;
pub use error::{AggregatorError, AggregatorResult};
pub use scheduler::FlushScheduler;
pub use store::MarketDataStore;
pub use stream::StandardStream;

use common::{Interval, Kline, KlineSink, MarketDataStream, Px, Symbol, Trade};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Serial kline aggregator for a single symbol.
///
/// Runs in one of two modes fixed at construction:
/// - kline-driven (default): closed base-interval klines from the stream go
///   straight into the roll-up engine
/// - trade-driven: trades feed an [`OhlcvAccumulator`] which a
///   [`FlushScheduler`] closes once per base interval
///
/// Exactly one producer feeds the roll-up engine in either mode.
#[derive(Debug)]
pub struct SerialKlineAggregator {
    symbol: Symbol,
    base_interval: Interval,
    use_market_trade: bool,
    accumulator: Arc<OhlcvAccumulator>,
    rollup: Arc<RollupEngine>,
}

impl SerialKlineAggregator {
    /// Create a kline-driven aggregator emitting into `sink`
    pub fn new(symbol: Symbol, base_interval: Interval, sink: impl KlineSink + 'static) -> Self {
        let sink: Arc<dyn KlineSink> = Arc::new(sink);
        Self {
            accumulator: Arc::new(OhlcvAccumulator::new(symbol.clone())),
            rollup: Arc::new(RollupEngine::new(symbol.clone(), base_interval, sink)),
            symbol,
            base_interval,
            use_market_trade: false,
        }
    }

    /// Build base klines from market trades instead of closed klines
    #[must_use]
    pub fn with_market_trade(mut self, enabled: bool) -> Self {
        self.use_market_trade = enabled;
        self
    }

    /// Create a validated aggregator subscribed to every configured interval
    pub fn from_config(
        config: &AggregatorConfig,
        sink: impl KlineSink + 'static,
    ) -> AggregatorResult<Self> {
        config.validate()?;
        let aggregator = Self::new(Symbol::new(config.symbol.as_str()), config.base_interval, sink)
            .with_market_trade(config.use_market_trade);
        for &interval in &config.intervals {
            aggregator.subscribe(interval);
        }
        Ok(aggregator)
    }

    /// Tracked symbol
    #[must_use]
    pub const fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    /// Base interval
    #[must_use]
    pub const fn base_interval(&self) -> Interval {
        self.base_interval
    }

    /// Whether base klines are built from trades
    #[must_use]
    pub const fn uses_market_trade(&self) -> bool {
        self.use_market_trade
    }

    /// Roll up into `interval` as well; subscribing twice has no effect
    pub fn subscribe(&self, interval: Interval) {
        if self.rollup.subscribe(interval) {
            info!("{} subscribed to {} klines", self.symbol, interval);
        }
    }

    /// Subscribed intervals in subscription order
    #[must_use]
    pub fn subscriptions(&self) -> Vec<Interval> {
        self.rollup.subscriptions()
    }

    /// In-progress kline for `interval`, if a bucket is open
    #[must_use]
    pub fn pending(&self, interval: Interval) -> Option<Kline> {
        self.rollup.pending(interval)
    }

    /// Last traded price seen in trade-driven mode
    #[must_use]
    pub fn last_price(&self) -> Px {
        self.accumulator.last_price()
    }

    /// Feed a closed base-interval kline into the roll-up engine
    pub fn add_kline(&self, kline: &Kline, delivery: Delivery) {
        self.rollup.add_kline(kline, delivery);
    }

    /// Wire the aggregator to `stream`. Call once per aggregator.
    ///
    /// In trade-driven mode the flush scheduler is spawned on the current
    /// tokio runtime and its handle returned; it stops when `cancel` fires.
    /// Outside a runtime nothing is registered, since trades would pile up
    /// in a bucket that is never flushed. In kline-driven mode nothing is
    /// spawned and `cancel` is unused.
    pub fn bind(
        &self,
        cancel: CancellationToken,
        stream: &dyn MarketDataStream,
    ) -> Option<JoinHandle<()>> {
        if !self.use_market_trade {
            let rollup = Arc::clone(&self.rollup);
            stream.on_kline_closed(Box::new(move |kline: Kline| {
                rollup.add_kline(&kline, Delivery::Inline);
            }));
            info!("{} bound to closed {} klines", self.symbol, self.base_interval);
            return None;
        }

        let scheduler = FlushScheduler::new(
            self.symbol.clone(),
            self.base_interval,
            Arc::clone(&self.accumulator),
            Arc::clone(&self.rollup),
        );
        let runtime = match Handle::try_current() {
            Ok(runtime) => runtime,
            Err(e) => {
                error!(
                    "{} cannot start flush scheduler outside a tokio runtime: {}",
                    self.symbol, e
                );
                return None;
            }
        };
        let handle = runtime.spawn(scheduler.run(cancel));

        let accumulator = Arc::clone(&self.accumulator);
        stream.on_market_trade(Box::new(move |trade: Trade| accumulator.observe(&trade)));
        info!("{} bound to market trades, base interval {}", self.symbol, self.base_interval);
        Some(handle)
    }
}
