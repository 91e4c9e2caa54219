//! Bybit Types
//!
//! Topic naming and v5 public stream payloads.
//!
//! Envelope: {"topic": "tickers.BTCUSDT", "type": "snapshot"|"delta", "ts": .., "data": ..}
//! Acks:     {"op": "subscribe", "success": true, "ret_msg": "", "conn_id": ..}

use serde::Deserialize;
use serde_json::Value;

use crate::adapters::types::{
    collect_levels, json_f64, CandleEvent, Interval, OrderBookEvent, TickerEvent,
};

/// Linear contracts are quoted in USDT
const QUOTE: &str = "USDT";

pub const TICKER_PREFIX: &str = "tickers.";
pub const KLINE_PREFIX: &str = "kline.";
pub const ORDERBOOK_PREFIX: &str = "orderbook.";

/// Bybit kline interval code
pub fn interval_code(interval: Interval) -> &'static str {
    match interval {
        Interval::OneMinute => "1",
        Interval::FiveMinutes => "5",
        Interval::FifteenMinutes => "15",
        Interval::ThirtyMinutes => "30",
        Interval::OneHour => "60",
        Interval::FourHours => "240",
        Interval::OneDay => "D",
    }
}

/// `"btc"` → `"BTCUSDT"`
pub fn contract(symbol: &str) -> String {
    format!("{}{}", symbol.trim().to_ascii_uppercase(), QUOTE)
}

/// `"BTCUSDT"` → `"BTC"`
pub fn symbol_from_contract(contract: &str) -> String {
    contract.strip_suffix(QUOTE).unwrap_or(contract).to_string()
}

/// Top-level stream frame
#[derive(Debug, Clone, Deserialize)]
pub struct BybitEnvelope {
    pub topic: Option<String>,
    #[serde(rename = "type")]
    pub msg_type: Option<String>,
    pub ts: Option<u64>,
    pub data: Option<Value>,
    /// Present on subscribe/unsubscribe/pong acks
    pub op: Option<String>,
    pub success: Option<bool>,
    pub ret_msg: Option<String>,
}

/// `tickers.*` payload; deltas omit unchanged fields
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BybitTicker {
    pub symbol: Option<String>,
    pub price24h_pcnt: Option<Value>,
    pub funding_rate: Option<Value>,
    pub index_price: Option<Value>,
    pub mark_price: Option<Value>,
}

impl BybitTicker {
    pub fn to_event(&self, fallback_symbol: &str) -> TickerEvent {
        let symbol = self
            .symbol
            .as_deref()
            .map(symbol_from_contract)
            .unwrap_or_else(|| fallback_symbol.to_string());
        TickerEvent {
            symbol,
            // price24hPcnt is a fraction ("0.0123" = 1.23%)
            change_percent: json_f64(self.price24h_pcnt.as_ref()).map(|p| p * 100.0),
            funding_rate: json_f64(self.funding_rate.as_ref()),
            index_price: json_f64(self.index_price.as_ref()),
            mark_price: json_f64(self.mark_price.as_ref()),
        }
    }
}

/// One `kline.*` entry
#[derive(Debug, Clone, Deserialize)]
pub struct BybitKline {
    pub start: i64,
    pub open: Value,
    pub high: Value,
    pub low: Value,
    pub close: Value,
    pub volume: Value,
}

impl BybitKline {
    pub fn to_event(&self, symbol: &str) -> Option<CandleEvent> {
        Some(CandleEvent {
            symbol: symbol.to_string(),
            time_ms: self.start,
            open: json_f64(Some(&self.open))?,
            high: json_f64(Some(&self.high))?,
            low: json_f64(Some(&self.low))?,
            close: json_f64(Some(&self.close))?,
            volume: json_f64(Some(&self.volume)).unwrap_or(0.0),
        })
    }
}

/// `orderbook.*` payload: `[price, size]` string pairs
#[derive(Debug, Clone, Deserialize)]
pub struct BybitOrderbook {
    pub s: String,
    #[serde(default)]
    pub b: Vec<Vec<Value>>,
    #[serde(default)]
    pub a: Vec<Vec<Value>>,
}

impl BybitOrderbook {
    pub fn to_event(&self, timestamp_ms: u64) -> OrderBookEvent {
        let pair = |level: &Vec<Value>| (json_f64(level.first()), json_f64(level.get(1)));
        OrderBookEvent {
            symbol: symbol_from_contract(&self.s),
            bids: collect_levels(self.b.iter().map(pair)),
            asks: collect_levels(self.a.iter().map(pair)),
            timestamp_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_codes() {
        assert_eq!(interval_code(Interval::OneMinute), "1");
        assert_eq!(interval_code(Interval::FourHours), "240");
        assert_eq!(interval_code(Interval::OneDay), "D");
    }

    #[test]
    fn test_contract_translation() {
        assert_eq!(contract("btc"), "BTCUSDT");
        assert_eq!(symbol_from_contract("ETHUSDT"), "ETH");
    }

    #[test]
    fn test_ticker_delta_keeps_absent_fields_empty() {
        let json = r#"{"symbol":"BTCUSDT","markPrice":"65000.5"}"#;
        let ticker: BybitTicker = serde_json::from_str(json).unwrap();
        let event = ticker.to_event("BTC");
        assert_eq!(event.symbol, "BTC");
        assert_eq!(event.mark_price, Some(65000.5));
        assert!(event.funding_rate.is_none());
    }
}
