//! Integration tests for binding the aggregator to a market data stream

use chrono::{DateTime, Utc};
use common::{Interval, Kline, Px, Symbol};
use kline_aggregator::{AggregatorConfig, MarketDataStore, SerialKlineAggregator, StandardStream};
use pretty_assertions::assert_eq;
use rstest::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use test_utils::{
    KlineFactory, RecordingSink, TradeFactory, assert_aligned, assert_flat, assert_ohlc_consistent,
    base_time, drain, init_test_logging, recv_n, symbol,
};
use tokio_util::sync::CancellationToken;

#[rstest]
fn test_kline_mode_fills_store_windows(
    symbol: Symbol,
    base_time: DateTime<Utc>,
) -> anyhow::Result<()> {
    init_test_logging();
    let store = Arc::new(MarketDataStore::new(symbol.clone(), 10));
    let window_updates = Arc::new(AtomicUsize::new(0));
    let updates = Arc::clone(&window_updates);
    store.on_kline_window_update(move |_, window| {
        assert!(window.len() <= 10);
        updates.fetch_add(1, Ordering::SeqCst);
    });

    let config = AggregatorConfig {
        symbol: symbol.to_string(),
        intervals: vec![Interval::M5, Interval::M15, Interval::H1],
        ..AggregatorConfig::default()
    };
    let aggregator = SerialKlineAggregator::from_config(&config, Arc::clone(&store))?;
    let stream = StandardStream::new();
    assert!(aggregator.bind(CancellationToken::new(), &stream).is_none());

    let mut factory = TradeFactory::new(symbol.clone(), 100.0);
    let klines = KlineFactory::new(symbol, Interval::M1, base_time);
    for i in 0..60 {
        let price = factory.next_trade(base_time).price.as_f64();
        stream.emit_kline_closed(&klines.flat(i, price));
    }

    assert_eq!(store.len(Interval::M5), 10);
    assert_eq!(store.len(Interval::M15), 4);
    assert_eq!(store.len(Interval::H1), 1);
    assert_eq!(window_updates.load(Ordering::SeqCst), 12 + 4 + 1);

    let hour = store.last_kline(Interval::H1).expect("hourly kline");
    assert_aligned(&hour, Interval::H1);
    assert_ohlc_consistent(&hour);
    assert_eq!(hour.number_of_trades, 60);
    Ok(())
}

#[rstest]
fn test_kline_mode_ignores_trades(symbol: Symbol) {
    let sink = Arc::new(RecordingSink::new());
    let aggregator = SerialKlineAggregator::new(symbol.clone(), Interval::M1, sink.clone());
    aggregator.subscribe(Interval::M1);

    let stream = StandardStream::new();
    let _ = aggregator.bind(CancellationToken::new(), &stream);
    stream.emit_market_trade(&TradeFactory::new(symbol, 1.0).next_trade(Utc::now()));

    assert_eq!(stream.trade_handler_count(), 0);
    assert_eq!(aggregator.last_price(), Px::ZERO);
    assert!(sink.is_empty());
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn test_trade_mode_end_to_end(symbol: Symbol) -> anyhow::Result<()> {
    let (sink, mut rx) = RecordingSink::with_channel();
    let aggregator =
        SerialKlineAggregator::new(symbol.clone(), Interval::S1, sink).with_market_trade(true);
    aggregator.subscribe(Interval::S1);
    aggregator.subscribe(Interval::M1);

    let stream = StandardStream::new();
    let cancel = CancellationToken::new();
    let handle = aggregator
        .bind(cancel.clone(), &stream)
        .ok_or_else(|| anyhow::anyhow!("scheduler not started"))?;
    assert_eq!(stream.kline_handler_count(), 0);

    let mut trades = TradeFactory::new(symbol.clone(), 50.0);
    stream.emit_market_trade(&trades.at(50.0, 1.0, Utc::now()));
    stream.emit_market_trade(&trades.at(55.0, 1.0, Utc::now()));
    stream.emit_market_trade(&trades.at(45.0, 1.0, Utc::now()));
    // foreign symbol and closed klines are not part of trade mode
    let foreign = TradeFactory::new(Symbol::from("ETHUSDT"), 9.0).next_trade(Utc::now());
    stream.emit_market_trade(&foreign);
    stream.emit_kline_closed(&Kline::new(symbol, Interval::S1, Utc::now()));
    assert_eq!(aggregator.last_price(), Px::new(45.0));

    let first = recv_n(&mut rx, 1, std::time::Duration::from_secs(600)).await?;
    assert_eq!(first[0].interval, Interval::S1);
    assert_eq!(first[0].number_of_trades, 3);
    assert_eq!(first[0].high, Px::new(55.0));
    assert_eq!(first[0].low, Px::new(45.0));

    // run until the minute closes; at most 60 more seconds
    let mut minute = None;
    while minute.is_none() {
        let next = recv_n(&mut rx, 1, std::time::Duration::from_secs(600)).await?;
        match next.into_iter().next() {
            Some(k) if k.interval == Interval::M1 => minute = Some(k),
            Some(k) => assert_flat(&k, 45.0),
            None => anyhow::bail!("channel closed"),
        }
    }
    let minute = minute.ok_or_else(|| anyhow::anyhow!("no minute kline"))?;
    assert!(minute.closed);
    assert_eq!(minute.number_of_trades, 3);
    assert_eq!(minute.close, Px::new(45.0));
    assert_eq!(minute.end_time.timestamp() % 60, 0);

    cancel.cancel();
    handle.await?;
    tokio::time::sleep(std::time::Duration::from_secs(5)).await;
    assert!(drain(&mut rx).is_empty());
    Ok(())
}

#[rstest]
fn test_trade_mode_outside_runtime_registers_nothing(symbol: Symbol) {
    let aggregator = SerialKlineAggregator::new(symbol, Interval::M1, RecordingSink::new())
        .with_market_trade(true);
    let stream = StandardStream::new();
    assert!(aggregator.bind(CancellationToken::new(), &stream).is_none());
    assert_eq!(stream.trade_handler_count(), 0);
    assert_eq!(stream.kline_handler_count(), 0);
}
