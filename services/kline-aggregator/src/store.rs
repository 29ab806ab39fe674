//! In-memory kline store used as the default downstream sink

use common::{Interval, Kline, KlineSink, Symbol};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::sync::Arc;
use tracing::trace;

/// Default number of klines kept per interval
pub const DEFAULT_WINDOW_CAPACITY: usize = 5_000;

type KlineClosedCallback = Arc<dyn Fn(&Kline) + Send + Sync>;
type WindowUpdateCallback = Arc<dyn Fn(Interval, &[Kline]) + Send + Sync>;

/// Keeps a bounded window of finalized klines per interval for one symbol
/// and notifies listeners whenever a kline is added.
pub struct MarketDataStore {
    symbol: Symbol,
    capacity: usize,
    windows: RwLock<FxHashMap<Interval, Vec<Kline>>>,
    kline_closed_callbacks: RwLock<Vec<KlineClosedCallback>>,
    window_update_callbacks: RwLock<Vec<WindowUpdateCallback>>,
}

impl std::fmt::Debug for MarketDataStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarketDataStore")
            .field("symbol", &self.symbol)
            .field("capacity", &self.capacity)
            .field("intervals", &self.windows.read().keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl MarketDataStore {
    /// Create a store keeping up to `capacity` klines per interval
    #[must_use]
    pub fn new(symbol: Symbol, capacity: usize) -> Self {
        Self {
            symbol,
            capacity: capacity.max(1),
            windows: RwLock::new(FxHashMap::default()),
            kline_closed_callbacks: RwLock::new(Vec::new()),
            window_update_callbacks: RwLock::new(Vec::new()),
        }
    }

    /// Tracked symbol
    #[must_use]
    pub const fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    /// Register a callback fired with every accepted kline
    pub fn on_kline_closed(&self, callback: impl Fn(&Kline) + Send + Sync + 'static) {
        self.kline_closed_callbacks.write().push(Arc::new(callback));
    }

    /// Register a callback fired with the updated window after every
    /// accepted kline
    pub fn on_kline_window_update(
        &self,
        callback: impl Fn(Interval, &[Kline]) + Send + Sync + 'static,
    ) {
        self.window_update_callbacks.write().push(Arc::new(callback));
    }

    /// Stored klines for `interval`, oldest first
    #[must_use]
    pub fn klines(&self, interval: Interval) -> Option<Vec<Kline>> {
        self.windows.read().get(&interval).cloned()
    }

    /// Most recent kline for `interval`
    #[must_use]
    pub fn last_kline(&self, interval: Interval) -> Option<Kline> {
        self.windows
            .read()
            .get(&interval)
            .and_then(|window| window.last().cloned())
    }

    /// Number of stored klines for `interval`
    #[must_use]
    pub fn len(&self, interval: Interval) -> usize {
        self.windows.read().get(&interval).map_or(0, Vec::len)
    }
}

impl KlineSink for MarketDataStore {
    fn add_kline(&self, kline: Kline) {
        if kline.symbol != self.symbol {
            trace!("store for {} ignoring {} kline", self.symbol, kline.symbol);
            return;
        }

        let interval = kline.interval;
        let window = {
            let mut windows = self.windows.write();
            let window = windows.entry(interval).or_default();
            window.push(kline.clone());
            if window.len() > self.capacity {
                let excess = window.len() - self.capacity;
                window.drain(0..excess);
            }
            window.clone()
        };

        let closed = self.kline_closed_callbacks.read().clone();
        for callback in closed {
            callback(&kline);
        }
        let updates = self.window_update_callbacks.read().clone();
        for callback in updates {
            callback(interval, &window);
        }
    }
}
