//! Gate.io Types
//!
//! Envelope: {"time": .., "channel": "futures.tickers", "event": "update"|"all"|"subscribe"|"unsubscribe",
//!            "result": .., "error": ..}
//!
//! Acks carry `event: subscribe|unsubscribe` and are not market data.

use serde::Deserialize;
use serde_json::Value;

use crate::adapters::types::{
    collect_levels, json_f64, CandleEvent, Interval, OrderBookEvent, TickerEvent,
};

const QUOTE_SUFFIX: &str = "_USDT";

pub const TICKERS_CHANNEL: &str = "futures.tickers";
pub const CANDLES_CHANNEL: &str = "futures.candlesticks";
pub const ORDERBOOK_CHANNEL: &str = "futures.order_book";
pub const PING_CHANNEL: &str = "futures.ping";

/// Gate.io candlestick interval (native strings match ours)
pub fn interval_code(interval: Interval) -> &'static str {
    interval.as_str()
}

/// `"btc"` → `"BTC_USDT"`
pub fn contract(symbol: &str) -> String {
    format!("{}{}", symbol.trim().to_ascii_uppercase(), QUOTE_SUFFIX)
}

/// `"BTC_USDT"` → `"BTC"`
pub fn symbol_from_contract(contract: &str) -> String {
    contract
        .strip_suffix(QUOTE_SUFFIX)
        .unwrap_or(contract)
        .to_string()
}

/// Whether an `event` value carries market data
pub fn is_data_event(event: &str) -> bool {
    matches!(event, "update" | "all")
}

/// Top-level frame
#[derive(Debug, Clone, Deserialize)]
pub struct GateEnvelope {
    pub time: Option<i64>,
    pub channel: Option<String>,
    pub event: Option<String>,
    pub result: Option<Value>,
    pub error: Option<Value>,
}

/// `futures.tickers` entry
#[derive(Debug, Clone, Deserialize)]
pub struct GateTicker {
    pub contract: String,
    /// Already a percentage ("1.23" = 1.23%)
    pub change_percentage: Option<Value>,
    pub funding_rate: Option<Value>,
    pub mark_price: Option<Value>,
    pub index_price: Option<Value>,
}

impl GateTicker {
    pub fn to_event(&self) -> TickerEvent {
        TickerEvent {
            symbol: symbol_from_contract(&self.contract),
            change_percent: json_f64(self.change_percentage.as_ref()),
            funding_rate: json_f64(self.funding_rate.as_ref()),
            index_price: json_f64(self.index_price.as_ref()),
            mark_price: json_f64(self.mark_price.as_ref()),
        }
    }
}

/// `futures.candlesticks` entry; `t` is in seconds, `n` is `"{interval}_{contract}"`
#[derive(Debug, Clone, Deserialize)]
pub struct GateCandle {
    pub t: i64,
    pub o: Value,
    pub h: Value,
    pub l: Value,
    pub c: Value,
    #[serde(default)]
    pub v: Option<Value>,
    pub n: String,
}

impl GateCandle {
    pub fn to_event(&self) -> Option<CandleEvent> {
        let (_, name) = self.n.split_once('_')?;
        Some(CandleEvent {
            symbol: symbol_from_contract(name),
            time_ms: self.t.saturating_mul(1000),
            open: json_f64(Some(&self.o))?,
            high: json_f64(Some(&self.h))?,
            low: json_f64(Some(&self.l))?,
            close: json_f64(Some(&self.c))?,
            volume: json_f64(self.v.as_ref()).unwrap_or(0.0),
        })
    }
}

/// Price level `{p, s}`
#[derive(Debug, Clone, Deserialize)]
pub struct GateLevel {
    pub p: Value,
    pub s: Value,
}

/// `futures.order_book` snapshot
#[derive(Debug, Clone, Deserialize)]
pub struct GateOrderbook {
    /// Milliseconds
    pub t: Option<u64>,
    pub contract: String,
    #[serde(default)]
    pub asks: Vec<GateLevel>,
    #[serde(default)]
    pub bids: Vec<GateLevel>,
}

impl GateOrderbook {
    pub fn to_event(&self, fallback_ms: u64) -> OrderBookEvent {
        let pair = |l: &GateLevel| (json_f64(Some(&l.p)), json_f64(Some(&l.s)));
        OrderBookEvent {
            symbol: symbol_from_contract(&self.contract),
            bids: collect_levels(self.bids.iter().map(pair)),
            asks: collect_levels(self.asks.iter().map(pair)),
            timestamp_ms: self.t.unwrap_or(fallback_ms),
        }
    }
}
