//! Integration tests for concurrent ingestion

use chrono::{DateTime, Duration, Utc};
use common::{Interval, Qty, Symbol};
use kline_aggregator::{
    Delivery, OhlcvAccumulator, RollupEngine, SerialKlineAggregator, StandardStream,
};
use pretty_assertions::assert_eq;
use rstest::*;
use std::collections::HashSet;
use std::sync::Arc;
use test_utils::{KlineFactory, RecordingSink, TradeFactory, base_time, recv_n, symbol};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

const PRODUCERS: usize = 8;
const TRADES_PER_PRODUCER: usize = 250;

#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_observe_loses_no_trades(symbol: Symbol) -> anyhow::Result<()> {
    let accumulator = Arc::new(OhlcvAccumulator::new(symbol.clone()));
    let mut join_set = JoinSet::new();

    for producer in 0..PRODUCERS {
        let accumulator = Arc::clone(&accumulator);
        let symbol = symbol.clone();
        join_set.spawn(async move {
            let mut factory = TradeFactory::new(symbol, 100.0 + producer as f64);
            let mut volume = Qty::ZERO;
            for trade in factory.batch(TRADES_PER_PRODUCER, Utc::now(), Duration::milliseconds(1)) {
                volume += trade.quantity;
                accumulator.observe(&trade);
                tokio::task::yield_now().await;
            }
            volume
        });
    }

    let mut expected_volume = Qty::ZERO;
    while let Some(volume) = join_set.join_next().await {
        expected_volume += volume?;
    }

    let snapshot = accumulator.flush_and_reset();
    assert_eq!(snapshot.trades, (PRODUCERS * TRADES_PER_PRODUCER) as u64);
    assert_eq!(snapshot.volume, expected_volume);
    assert!(snapshot.low <= snapshot.high);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_pass_through_rollup(
    symbol: Symbol,
    base_time: DateTime<Utc>,
) -> anyhow::Result<()> {
    let sink = Arc::new(RecordingSink::new());
    let engine = Arc::new(RollupEngine::new(symbol.clone(), Interval::M1, sink.clone()));
    let klines = KlineFactory::new(symbol, Interval::M1, base_time).from_closes(&[7.0; 240]);
    engine.subscribe(Interval::M1);

    let mut join_set = JoinSet::new();
    for chunk in klines.chunks(30) {
        let engine = Arc::clone(&engine);
        let chunk = chunk.to_vec();
        join_set.spawn(async move {
            // repeated subscribes from every task are no-ops
            engine.subscribe(Interval::M1);
            for kline in &chunk {
                engine.add_kline(kline, Delivery::Inline);
            }
        });
    }
    while let Some(result) = join_set.join_next().await {
        result?;
    }

    assert_eq!(engine.subscriptions(), vec![Interval::M1]);
    let starts: HashSet<DateTime<Utc>> = sink.klines().iter().map(|k| k.start_time).collect();
    assert_eq!(sink.len(), klines.len());
    assert_eq!(starts.len(), klines.len());
    assert!(engine.pending(Interval::M1).is_none());
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_trades_through_stream(symbol: Symbol) -> anyhow::Result<()> {
    let (sink, mut rx) = RecordingSink::with_channel();
    let aggregator =
        SerialKlineAggregator::new(symbol.clone(), Interval::S1, sink).with_market_trade(true);
    aggregator.subscribe(Interval::S1);

    let stream = Arc::new(StandardStream::new());
    let cancel = CancellationToken::new();
    let handle = aggregator
        .bind(cancel.clone(), stream.as_ref())
        .ok_or_else(|| anyhow::anyhow!("scheduler not started"))?;

    let mut join_set = JoinSet::new();
    for _ in 0..PRODUCERS {
        let stream = Arc::clone(&stream);
        let symbol = symbol.clone();
        join_set.spawn(async move {
            let mut factory = TradeFactory::new(symbol, 100.0);
            for trade in factory.batch(TRADES_PER_PRODUCER, Utc::now(), Duration::milliseconds(1)) {
                stream.emit_market_trade(&trade);
            }
        });
    }
    while let Some(result) = join_set.join_next().await {
        result?;
    }

    // every trade shows up in exactly one base kline
    let expected = (PRODUCERS * TRADES_PER_PRODUCER) as u64;
    let mut seen = 0;
    while seen < expected {
        let klines = recv_n(&mut rx, 1, std::time::Duration::from_secs(10)).await?;
        seen += klines.iter().map(|k| k.number_of_trades).sum::<u64>();
    }
    assert_eq!(seen, expected);

    cancel.cancel();
    handle.await?;
    Ok(())
}
