//! Bybit Adapter Implementation
//!
//! v5 public stream: `{"op": "subscribe"|"unsubscribe", "args": [topics]}`.
//! Topics: `orderbook.{depth}.{SYM}USDT`, `kline.{code}.{SYM}USDT`,
//! `tickers.{SYM}USDT`.
//!
//! Docs: https://bybit-exchange.github.io/docs/v5/ws/connect

use serde_json::{json, Value};

use crate::adapters::errors::ExchangeResult;
use crate::adapters::traits::{required_interval, required_symbols, ProtocolAdapter};
use crate::adapters::types::{
    current_time_ms, Channel, Exchange, MarketEvent, SubscriptionRequest,
};

use super::config::BybitConfig;
use super::types::{
    contract, interval_code, symbol_from_contract, BybitEnvelope, BybitKline, BybitOrderbook,
    BybitTicker, KLINE_PREFIX, ORDERBOOK_PREFIX, TICKER_PREFIX,
};

/// Bybit protocol adapter
pub struct BybitAdapter {
    config: BybitConfig,
}

impl BybitAdapter {
    pub fn new(config: BybitConfig) -> Self {
        Self { config }
    }

    fn topics(&self, request: &SubscriptionRequest) -> ExchangeResult<Vec<String>> {
        let params = &request.params;
        let symbols = required_symbols(Exchange::Bybit, request.channel, params)?;

        let topics = match request.channel {
            Channel::Orderbook => symbols
                .iter()
                .map(|s| {
                    format!("{}{}.{}", ORDERBOOK_PREFIX, self.config.orderbook_depth, contract(s))
                })
                .collect(),
            Channel::Kline => {
                let interval = required_interval(Exchange::Bybit, request.channel, params)?;
                symbols
                    .iter()
                    .map(|s| format!("{}{}.{}", KLINE_PREFIX, interval_code(interval), contract(s)))
                    .collect()
            }
            Channel::Ticker => symbols
                .iter()
                .map(|s| format!("{}{}", TICKER_PREFIX, contract(s)))
                .collect(),
        };
        Ok(topics)
    }

    /// Last dotted segment of a topic, as a base symbol
    fn topic_symbol(topic: &str) -> String {
        symbol_from_contract(topic.rsplit('.').next().unwrap_or(topic))
    }
}

impl ProtocolAdapter for BybitAdapter {
    fn exchange(&self) -> Exchange {
        Exchange::Bybit
    }

    fn ws_url(&self) -> &str {
        self.config.ws_url()
    }

    fn supports(&self, _channel: Channel) -> bool {
        true
    }

    fn supports_unsubscribe(&self) -> bool {
        true
    }

    fn request_message(&self, request: &SubscriptionRequest) -> ExchangeResult<String> {
        let topics = self.topics(request)?;
        Ok(json!({
            "op": request.op.as_str(),
            "args": topics,
        })
        .to_string())
    }

    fn parse_message(&self, raw: &str) -> Option<MarketEvent> {
        let envelope: BybitEnvelope = match serde_json::from_str(raw) {
            Ok(e) => e,
            Err(e) => {
                tracing::trace!(exchange = "bybit", error = %e, "Unparseable frame");
                return None;
            }
        };

        if let Some(op) = &envelope.op {
            tracing::debug!(
                exchange = "bybit",
                op = %op,
                success = ?envelope.success,
                ret_msg = ?envelope.ret_msg,
                "Bybit ack"
            );
            return None;
        }

        let topic = envelope.topic.as_deref()?;
        let data = envelope.data?;

        if topic.starts_with(TICKER_PREFIX) {
            let ticker: BybitTicker = serde_json::from_value(data).ok()?;
            Some(MarketEvent::Ticker(ticker.to_event(&Self::topic_symbol(topic))))
        } else if topic.starts_with(KLINE_PREFIX) {
            let entry = match data {
                Value::Array(mut entries) if !entries.is_empty() => entries.swap_remove(0),
                _ => return None,
            };
            let kline: BybitKline = serde_json::from_value(entry).ok()?;
            kline
                .to_event(&Self::topic_symbol(topic))
                .map(MarketEvent::Kline)
        } else if topic.starts_with(ORDERBOOK_PREFIX) {
            let book: BybitOrderbook = serde_json::from_value(data).ok()?;
            let ts = envelope.ts.unwrap_or_else(current_time_ms);
            Some(MarketEvent::Orderbook(book.to_event(ts)))
        } else {
            tracing::trace!(exchange = "bybit", topic = %topic, "Ignoring topic");
            None
        }
    }

    fn heartbeat_message(&self) -> Option<String> {
        Some(json!({ "op": "ping" }).to_string())
    }
}

// =============================================================================
// Tests
// =============================================================================
