//! Kline Aggregator Service
//!
//! Reads market events as JSON lines from stdin, rolls them up into the
//! configured intervals and writes every closed kline to stdout as one JSON
//! object per line.
//!
//! Input lines:
//! - `{"type":"trade","symbol":"BTCUSDT","price":42000.5,"quantity":0.01}`
//! - `{"type":"kline","symbol":"BTCUSDT","interval":"1m","start_time":"2024-01-01T00:00:00Z",
//!   "open":1.0,"high":1.2,"low":0.9,"close":1.1,"volume":10.0}`

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::Parser;
use common::{Interval, Kline, Px, Qty, Symbol, Trade};
use kline_aggregator::{AggregatorConfig, MarketDataStore, SerialKlineAggregator, StandardStream};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const SERVICE_NAME: &str = "kline-aggregator";

#[derive(Parser, Debug)]
#[command(name = "kline-aggregator")]
#[command(about = "Roll market trades or klines up into coarser klines")]
#[command(version)]
struct Cli {
    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Symbol to aggregate
    #[arg(long)]
    symbol: Option<String>,

    /// Base interval, e.g. 1m
    #[arg(long)]
    base_interval: Option<Interval>,

    /// Comma separated intervals to roll up to, e.g. 5m,1h
    #[arg(long, value_delimiter = ',')]
    intervals: Vec<Interval>,

    /// Build base klines from trades
    #[arg(long)]
    use_market_trade: bool,

    /// Klines kept in memory per interval
    #[arg(long)]
    window_capacity: Option<usize>,
}

impl Cli {
    /// File (or default) configuration with command line overrides applied
    fn into_config(self) -> Result<AggregatorConfig> {
        let mut config = match &self.config {
            Some(path) => AggregatorConfig::from_file(path)?,
            None => AggregatorConfig::default(),
        };
        if let Some(symbol) = self.symbol {
            config.symbol = symbol;
        }
        if let Some(base_interval) = self.base_interval {
            config.base_interval = base_interval;
        }
        if !self.intervals.is_empty() {
            config.intervals = self.intervals;
        }
        if self.use_market_trade {
            config.use_market_trade = true;
        }
        if let Some(capacity) = self.window_capacity {
            config.window_capacity = capacity;
        }
        config.validate()?;
        Ok(config)
    }
}

/// Market event as read from stdin
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum InputEvent {
    Trade {
        symbol: String,
        price: f64,
        quantity: f64,
        quote_quantity: Option<f64>,
        #[serde(default)]
        id: u64,
        time: Option<DateTime<Utc>>,
    },
    Kline {
        symbol: String,
        interval: Interval,
        start_time: DateTime<Utc>,
        end_time: Option<DateTime<Utc>>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
        quote_volume: Option<f64>,
        #[serde(default)]
        number_of_trades: u64,
    },
}

enum MarketEvent {
    Trade(Trade),
    Kline(Kline),
}

impl From<InputEvent> for MarketEvent {
    fn from(event: InputEvent) -> Self {
        match event {
            InputEvent::Trade {
                symbol,
                price,
                quantity,
                quote_quantity,
                id,
                time,
            } => {
                let mut trade = Trade::new(
                    Symbol::new(symbol),
                    Px::new(price),
                    Qty::new(quantity),
                    time.unwrap_or_else(Utc::now),
                );
                trade.id = id;
                if let Some(quote) = quote_quantity {
                    trade.quote_quantity = Qty::new(quote);
                }
                Self::Trade(trade)
            }
            InputEvent::Kline {
                symbol,
                interval,
                start_time,
                end_time,
                open,
                high,
                low,
                close,
                volume,
                quote_volume,
                number_of_trades,
            } => {
                let mut kline = Kline::new(Symbol::new(symbol), interval, start_time);
                if let Some(end_time) = end_time {
                    kline.end_time = end_time;
                }
                kline.open = Px::new(open);
                kline.high = Px::new(high);
                kline.low = Px::new(low);
                kline.close = Px::new(close);
                kline.volume = Qty::new(volume);
                kline.quote_volume = quote_volume.map_or(Qty::ZERO, Qty::new);
                kline.number_of_trades = number_of_trades;
                kline.closed = true;
                Self::Kline(kline)
            }
        }
    }
}

/// Closed kline as written to stdout
#[derive(Debug, Serialize)]
struct KlineOutput<'a> {
    symbol: &'a str,
    interval: Interval,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
    quote_volume: f64,
    number_of_trades: u64,
    closed: bool,
}

impl<'a> From<&'a Kline> for KlineOutput<'a> {
    fn from(kline: &'a Kline) -> Self {
        Self {
            symbol: kline.symbol.as_str(),
            interval: kline.interval,
            start_time: kline.start_time,
            end_time: kline.end_time,
            open: kline.open.as_f64(),
            high: kline.high.as_f64(),
            low: kline.low.as_f64(),
            close: kline.close.as_f64(),
            volume: kline.volume.as_f64(),
            quote_volume: kline.quote_volume.as_f64(),
            number_of_trades: kline.number_of_trades,
            closed: kline.closed,
        }
    }
}

/// Publish stdin events on `stream` until end of input, then cancel
async fn read_events(stream: Arc<StandardStream>, cancel: CancellationToken) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut count = 0u64;

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line,
            () = cancel.cancelled() => break,
        };
        match line {
            Ok(Some(line)) => {
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<InputEvent>(&line) {
                    Ok(event) => {
                        count += 1;
                        match MarketEvent::from(event) {
                            MarketEvent::Trade(trade) => stream.emit_market_trade(&trade),
                            MarketEvent::Kline(kline) => stream.emit_kline_closed(&kline),
                        }
                    }
                    Err(e) => warn!("Skipping malformed input line: {}", e),
                }
            }
            Ok(None) => {
                info!("End of input after {} events", count);
                break;
            }
            Err(e) => {
                error!("Failed to read stdin: {}", e);
                break;
            }
        }
    }
    cancel.cancel();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing()?;

    let config = Cli::parse().into_config()?;
    info!(
        "Starting {} v{} for {} (base {}, intervals {:?}, trades {})",
        SERVICE_NAME,
        env!("CARGO_PKG_VERSION"),
        config.symbol,
        config.base_interval,
        config.intervals,
        config.use_market_trade
    );

    let store = Arc::new(MarketDataStore::new(
        Symbol::new(config.symbol.as_str()),
        config.window_capacity,
    ));
    store.on_kline_closed(|kline| match serde_json::to_string(&KlineOutput::from(kline)) {
        Ok(line) => println!("{line}"),
        Err(e) => error!("Failed to encode kline: {}", e),
    });

    let aggregator = SerialKlineAggregator::from_config(&config, Arc::clone(&store))?;
    let stream = Arc::new(StandardStream::new());
    let cancel = CancellationToken::new();
    let scheduler = aggregator.bind(cancel.clone(), stream.as_ref());

    let reader = tokio::spawn(read_events(Arc::clone(&stream), cancel.clone()));

    tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            if let Err(e) = signal {
                error!("Failed to listen for interrupt: {}", e);
            }
            info!("Interrupt received, shutting down");
        }
        () = cancel.cancelled() => {}
    }
    cancel.cancel();

    if let Some(handle) = scheduler {
        handle.await?;
    }
    if let Err(e) = reader.await {
        debug!("Input reader ended abnormally: {}", e);
    }

    info!("{} stopped", SERVICE_NAME);
    Ok(())
}

/// Initialize tracing with environment filter; logs go to stderr
fn init_tracing() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{}=info", SERVICE_NAME.replace('-', "_")).into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_line_number(true)
                .with_thread_ids(true),
        )
        .try_init()?;

    Ok(())
}
