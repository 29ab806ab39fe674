//! Wall-clock driven flush of the trade accumulator

use crate::aggregators::{Delivery, OhlcvAccumulator, RollupEngine};
use crate::boundary;
use chrono::{DateTime, Duration, Utc};
use common::{Interval, Kline, Symbol};
use std::sync::Arc;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Closes one base-interval kline per boundary out of the accumulator and
/// forwards it to the roll-up engine.
#[derive(Debug)]
pub struct FlushScheduler {
    symbol: Symbol,
    interval: Interval,
    accumulator: Arc<OhlcvAccumulator>,
    rollup: Arc<RollupEngine>,
}

impl FlushScheduler {
    /// Create a scheduler flushing `accumulator` into `rollup` every `interval`
    #[must_use]
    pub fn new(
        symbol: Symbol,
        interval: Interval,
        accumulator: Arc<OhlcvAccumulator>,
        rollup: Arc<RollupEngine>,
    ) -> Self {
        Self {
            symbol,
            interval,
            accumulator,
            rollup,
        }
    }

    /// Run until `cancel` fires.
    ///
    /// Waits for the next boundary of the interval, then flushes once per
    /// interval. Cancellation is honoured at every wait; the open bucket is
    /// abandoned.
    pub async fn run(self, cancel: CancellationToken) {
        let period = self.interval.to_duration();
        let now = Utc::now();
        let wait = boundary::time_until_next_boundary(now, period);
        let aligned = now + wait;
        info!(
            "{} {} flush scheduler aligning to {} ({}ms)",
            self.symbol,
            self.interval,
            aligned,
            wait.num_milliseconds()
        );

        tokio::select! {
            () = tokio::time::sleep(wait.to_std().unwrap_or_default()) => {}
            () = cancel.cancelled() => {
                info!(
                    "{} {} flush scheduler cancelled before alignment",
                    self.symbol, self.interval
                );
                return;
            }
        }

        let anchor = Instant::now();
        let step = self.interval.to_std();
        let mut ticker = tokio::time::interval_at(anchor + step, step);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                tick = ticker.tick() => {
                    let elapsed = Duration::from_std(tick - anchor).unwrap_or_default();
                    self.flush(aligned + elapsed);
                }
                () = cancel.cancelled() => break,
            }
        }
        info!("{} {} flush scheduler stopped", self.symbol, self.interval);
    }

    /// Close the current bucket as the kline ending at the boundary nearest
    /// to `tick` and hand it to the roll-up engine.
    pub fn flush(&self, tick: DateTime<Utc>) -> Kline {
        let period = self.interval.to_duration();
        let end_time = boundary::round_to_boundary(tick, period);
        let snapshot = self.accumulator.flush_and_reset();

        let kline = Kline {
            open: snapshot.open,
            high: snapshot.high,
            low: snapshot.low,
            close: snapshot.close,
            volume: snapshot.volume,
            quote_volume: snapshot.quote_volume,
            number_of_trades: snapshot.trades,
            end_time,
            closed: true,
            ..Kline::new(self.symbol.clone(), self.interval, end_time - period)
        };
        debug!(
            "flushed {} {} kline {} trades={} c={}",
            kline.symbol, kline.interval, kline.start_time, kline.number_of_trades, kline.close
        );

        self.rollup.add_kline(&kline, Delivery::Detached);
        kline
    }
}
