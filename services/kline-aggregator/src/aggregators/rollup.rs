//! Multi-interval roll-up of base-interval klines

use crate::boundary;
use common::{Interval, Kline, KlineSink, Symbol};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::{debug, trace, warn};

/// How a closed kline is handed to the sink
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Delivery {
    /// Call the sink before `add_kline` returns
    #[default]
    Inline,
    /// Hand the kline to a detached task; the caller never observes the outcome
    Detached,
}

#[derive(Debug, Default)]
struct RollupState {
    /// Subscribed intervals in insertion order
    subscriptions: Vec<Interval>,
    /// In-progress kline per subscribed interval
    pending: FxHashMap<Interval, Kline>,
}

/// Rolls closed base-interval klines up into every subscribed interval.
///
/// A subscribed kline closes when the end of an incoming base kline lands
/// exactly on a boundary of that interval, so subscribed intervals must be
/// whole multiples of the base interval. Subscriptions and the in-progress
/// table share one lock.
pub struct RollupEngine {
    symbol: Symbol,
    base_interval: Interval,
    sink: Arc<dyn KlineSink>,
    state: Mutex<RollupState>,
}

impl std::fmt::Debug for RollupEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RollupEngine")
            .field("symbol", &self.symbol)
            .field("base_interval", &self.base_interval)
            .field("sink", &"Arc<dyn KlineSink>")
            .field("state", &self.state)
            .finish()
    }
}

impl RollupEngine {
    /// Create an engine with no subscriptions
    #[must_use]
    pub fn new(symbol: Symbol, base_interval: Interval, sink: Arc<dyn KlineSink>) -> Self {
        Self {
            symbol,
            base_interval,
            sink,
            state: Mutex::new(RollupState::default()),
        }
    }

    /// Base interval consumed by the engine
    #[must_use]
    pub const fn base_interval(&self) -> Interval {
        self.base_interval
    }

    /// Add `interval` to the subscription list unless already present.
    ///
    /// Returns whether the list changed.
    pub fn subscribe(&self, interval: Interval) -> bool {
        let mut state = self.state.lock();
        if state.subscriptions.contains(&interval) {
            return false;
        }
        if !interval.is_multiple_of(self.base_interval) {
            warn!(
                "{} is not a multiple of base interval {}; its klines will not close on time",
                interval, self.base_interval
            );
        }
        state.subscriptions.push(interval);
        true
    }

    /// Subscribed intervals in insertion order
    #[must_use]
    pub fn subscriptions(&self) -> Vec<Interval> {
        self.state.lock().subscriptions.clone()
    }

    /// Copy of the in-progress kline for `interval`, if any
    #[must_use]
    pub fn pending(&self, interval: Interval) -> Option<Kline> {
        self.state.lock().pending.get(&interval).cloned()
    }

    /// Merge a closed base-interval kline into every subscribed interval and
    /// emit the ones that close on its end time.
    ///
    /// Klines for another symbol or another interval are dropped.
    pub fn add_kline(&self, kline: &Kline, delivery: Delivery) {
        if kline.symbol != self.symbol {
            trace!("dropping kline for {}, tracking {}", kline.symbol, self.symbol);
            return;
        }
        if kline.interval != self.base_interval {
            trace!(
                "dropping {} kline, base interval is {}",
                kline.interval, self.base_interval
            );
            return;
        }

        let end = kline.start_time + self.base_interval.to_duration();
        let closed = {
            let mut guard = self.state.lock();
            let RollupState {
                subscriptions,
                pending,
            } = &mut *guard;

            let mut closed = Vec::new();
            for &interval in subscriptions.iter() {
                match pending.entry(interval) {
                    Entry::Occupied(mut entry) => {
                        let k = entry.get_mut();
                        k.merge(kline);
                        k.closed = false;
                    }
                    Entry::Vacant(entry) => {
                        let k = entry.insert(Kline::new(
                            kline.symbol.clone(),
                            interval,
                            kline.start_time,
                        ));
                        k.set_from(kline);
                        k.interval = interval;
                        k.closed = false;
                    }
                }

                if boundary::is_boundary(end, interval.to_duration()) {
                    if let Some(mut k) = pending.remove(&interval) {
                        k.closed = true;
                        closed.push(k);
                    }
                }
            }
            closed
        };

        for k in closed {
            debug!(
                "closed {} {} kline {} - {} o={} h={} l={} c={} v={}",
                k.symbol, k.interval, k.start_time, k.end_time, k.open, k.high, k.low, k.close,
                k.volume
            );
            self.deliver(k, delivery);
        }
    }

    fn deliver(&self, kline: Kline, delivery: Delivery) {
        match delivery {
            Delivery::Inline => self.sink.add_kline(kline),
            Delivery::Detached => match Handle::try_current() {
                Ok(handle) => {
                    let sink = Arc::clone(&self.sink);
                    drop(handle.spawn(async move { sink.add_kline(kline) }));
                }
                Err(_) => {
                    warn!("no runtime for detached delivery, delivering {} inline", kline.interval);
                    self.sink.add_kline(kline);
                }
            },
        }
    }
}
