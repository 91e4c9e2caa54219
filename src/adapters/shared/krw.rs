//! Shared wire helpers for KRW venues (Upbit, Bithumb)
//!
//! Both venues speak the same ticket-based protocol: a subscription is a JSON
//! array `[{ticket}, {type, codes}..., {format}]` and every new array replaces
//! the previous subscription on that socket. There is no unsubscribe.

use serde_json::{json, Value};

use crate::adapters::types::{
    collect_levels, current_time_ms, json_f64, OrderBookEvent,
};

/// Quote currency prefix of KRW market codes
const KRW_PREFIX: &str = "KRW-";

/// `"BTC"` → `"KRW-BTC"`
pub fn market_code(symbol: &str) -> String {
    format!("{}{}", KRW_PREFIX, symbol.trim().to_ascii_uppercase())
}

/// `"KRW-BTC"` → `"BTC"`
pub fn symbol_from_code(code: &str) -> String {
    code.strip_prefix(KRW_PREFIX).unwrap_or(code).to_string()
}

/// Builder for a ticket envelope
#[derive(Debug, Clone)]
pub struct TicketEnvelope {
    sections: Vec<Value>,
}

impl TicketEnvelope {
    pub fn new(ticket: &str) -> Self {
        Self {
            sections: vec![json!({ "ticket": ticket })],
        }
    }

    /// Add a `{type, codes}` descriptor
    pub fn channel(mut self, kind: &str, codes: Vec<String>) -> Self {
        self.sections.push(json!({ "type": kind, "codes": codes }));
        self
    }

    /// Number of channel descriptors added so far
    pub fn channel_count(&self) -> usize {
        self.sections.len() - 1
    }

    pub fn finish(mut self) -> String {
        self.sections.push(json!({ "format": "DEFAULT" }));
        Value::Array(self.sections).to_string()
    }
}

/// Message type of a DEFAULT-format frame (`type`, or `ty` in SIMPLE format)
pub fn message_type(value: &Value) -> Option<&str> {
    value
        .get("type")
        .or_else(|| value.get("ty"))
        .and_then(Value::as_str)
}

/// Parse an `orderbook` frame
pub fn parse_orderbook(value: &Value) -> Option<OrderBookEvent> {
    let code = value.get("code").and_then(Value::as_str)?;
    let units = value.get("orderbook_units").and_then(Value::as_array)?;

    let bids = collect_levels(
        units
            .iter()
            .map(|u| (json_f64(u.get("bid_price")), json_f64(u.get("bid_size")))),
    );
    let asks = collect_levels(
        units
            .iter()
            .map(|u| (json_f64(u.get("ask_price")), json_f64(u.get("ask_size")))),
    );

    let timestamp_ms = value
        .get("timestamp")
        .and_then(Value::as_u64)
        .unwrap_or_else(current_time_ms);

    Some(OrderBookEvent {
        symbol: symbol_from_code(code),
        bids,
        asks,
        timestamp_ms,
    })
}

/// Error frames look like `{"error": {"name": ..., "message": ...}}`
pub fn error_message(value: &Value) -> Option<String> {
    let error = value.get("error")?;
    let name = error.get("name").and_then(Value::as_str).unwrap_or("UNKNOWN");
    let message = error.get("message").and_then(Value::as_str).unwrap_or("");
    Some(format!("{}: {}", name, message))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_market_code_round_trip() {
        assert_eq!(market_code("btc"), "KRW-BTC");
        assert_eq!(symbol_from_code("KRW-ETH"), "ETH");
        assert_eq!(symbol_from_code("BTC"), "BTC");
    }

    #[test]
    fn test_envelope_shape() {
        let msg = TicketEnvelope::new("t-1")
            .channel("orderbook", vec!["KRW-BTC".into()])
            .finish();
        let value: Value = serde_json::from_str(&msg).unwrap();
        let arr = value.as_array().unwrap();
        assert_eq!(arr.len(), 3);
        assert_eq!(arr[0]["ticket"], "t-1");
        assert_eq!(arr[1]["type"], "orderbook");
        assert_eq!(arr[1]["codes"][0], "KRW-BTC");
        assert_eq!(arr[2]["format"], "DEFAULT");
    }

    #[test]
    fn test_parse_orderbook_units() {
        let value = json!({
            "type": "orderbook",
            "code": "KRW-BTC",
            "timestamp": 1_700_000_000_000u64,
            "orderbook_units": [
                {"ask_price": 101.0, "bid_price": 100.0, "ask_size": 1.0, "bid_size": 2.0},
                {"ask_price": 102.0, "bid_price": 99.0, "ask_size": 0.5, "bid_size": "bad"}
            ]
        });
        let ob = parse_orderbook(&value).unwrap();
        assert_eq!(ob.symbol, "BTC");
        assert_eq!(ob.bids.len(), 1);
        assert_eq!(ob.asks.len(), 2);
        assert_eq!(ob.bids[0].total, 200.0);
        assert_eq!(ob.timestamp_ms, 1_700_000_000_000);
    }

    #[test]
    fn test_error_message() {
        let value = json!({"error": {"name": "INVALID_AUTH", "message": "bad"}});
        assert_eq!(error_message(&value).unwrap(), "INVALID_AUTH: bad");
        assert!(error_message(&json!({"type": "orderbook"})).is_none());
    }
}
