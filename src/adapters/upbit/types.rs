//! Upbit Types
//!
//! Interval codes and DEFAULT-format frame parsing for candle and ticker
//! channels. Order book frames share the KRW parser in `shared::krw`.
//!
//! Candle frame:
//!   {"type": "candle.1m", "code": "KRW-BTC", "candle_date_time_utc": "2024-01-01T00:00:00",
//!    "opening_price": .., "high_price": .., "low_price": .., "trade_price": ..,
//!    "candle_acc_trade_volume": .., "timestamp": ..}

use chrono::NaiveDateTime;
use serde_json::Value;

use crate::adapters::errors::{ExchangeError, ExchangeResult};
use crate::adapters::shared::krw::symbol_from_code;
use crate::adapters::types::{json_f64, CandleEvent, Interval, TickerEvent};

/// Candle channel prefix (`candle.1m`, `candle.60m`, ...)
pub const CANDLE_PREFIX: &str = "candle.";

/// KRW-quoted USDT market, appended to every candle request so consumers
/// can derive the KRW/USD rate.
pub const FX_SYMBOL: &str = "USDT";

/// Upbit candle unit for an interval. Hours are expressed in minutes and
/// there is no daily candle stream.
pub fn candle_unit(interval: Interval) -> ExchangeResult<&'static str> {
    match interval {
        Interval::OneMinute => Ok("1m"),
        Interval::FiveMinutes => Ok("5m"),
        Interval::FifteenMinutes => Ok("15m"),
        Interval::ThirtyMinutes => Ok("30m"),
        Interval::OneHour => Ok("60m"),
        Interval::FourHours => Ok("240m"),
        Interval::OneDay => Err(ExchangeError::UnsupportedInterval {
            exchange: "upbit",
            interval: interval.as_str(),
        }),
    }
}

/// Parse a `candle.*` frame
pub fn parse_candle(value: &Value) -> Option<CandleEvent> {
    let code = value.get("code").and_then(Value::as_str)?;

    let time_ms = value
        .get("candle_date_time_utc")
        .and_then(Value::as_str)
        .and_then(|s| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S").ok())
        .map(|dt| dt.and_utc().timestamp_millis())
        .or_else(|| value.get("timestamp").and_then(Value::as_i64))?;

    Some(CandleEvent {
        symbol: symbol_from_code(code),
        time_ms,
        open: json_f64(value.get("opening_price"))?,
        high: json_f64(value.get("high_price"))?,
        low: json_f64(value.get("low_price"))?,
        close: json_f64(value.get("trade_price"))?,
        volume: json_f64(value.get("candle_acc_trade_volume")).unwrap_or(0.0),
    })
}

/// Parse a `ticker` frame. Spot venues have no funding or mark price.
pub fn parse_ticker(value: &Value) -> Option<TickerEvent> {
    let code = value.get("code").and_then(Value::as_str)?;
    Some(TickerEvent {
        symbol: symbol_from_code(code),
        change_percent: json_f64(value.get("signed_change_rate")).map(|rate| rate * 100.0),
        ..Default::default()
    })
}
