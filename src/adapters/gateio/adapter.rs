//! Gate.io Adapter Implementation
//!
//! Requests: `{"time": secs, "channel": .., "event": "subscribe"|"unsubscribe", "payload": [..]}`
//!
//! - `futures.order_book`:   `[contract, depth, "0"]`, one contract per request
//! - `futures.candlesticks`: `[interval, contract]`, one contract per request
//! - `futures.tickers`:      `[contract, ...]`
//!
//! Docs: https://www.gate.io/docs/developers/futures/ws/en/

use serde_json::{json, Value};

use crate::adapters::errors::ExchangeResult;
use crate::adapters::traits::{
    required_interval, required_symbol, required_symbols, ProtocolAdapter,
};
use crate::adapters::types::{
    current_time_ms, Channel, Exchange, MarketEvent, SubscriptionRequest,
};

use super::config::GateioConfig;
use super::types::{
    contract, interval_code, is_data_event, GateCandle, GateEnvelope, GateOrderbook, GateTicker,
    CANDLES_CHANNEL, ORDERBOOK_CHANNEL, PING_CHANNEL, TICKERS_CHANNEL,
};

/// Gate.io protocol adapter
pub struct GateioAdapter {
    config: GateioConfig,
}

impl GateioAdapter {
    pub fn new(config: GateioConfig) -> Self {
        Self { config }
    }

    fn now_secs() -> u64 {
        current_time_ms() / 1000
    }

    fn channel_and_payload(
        &self,
        request: &SubscriptionRequest,
    ) -> ExchangeResult<(&'static str, Vec<String>)> {
        let params = &request.params;
        match request.channel {
            Channel::Orderbook => {
                let symbol = required_symbol(Exchange::Gateio, request.channel, params)?;
                Ok((
                    ORDERBOOK_CHANNEL,
                    vec![
                        contract(symbol),
                        self.config.orderbook_depth.to_string(),
                        "0".to_string(),
                    ],
                ))
            }
            Channel::Kline => {
                let symbol = required_symbol(Exchange::Gateio, request.channel, params)?;
                let interval = required_interval(Exchange::Gateio, request.channel, params)?;
                Ok((
                    CANDLES_CHANNEL,
                    vec![interval_code(interval).to_string(), contract(symbol)],
                ))
            }
            Channel::Ticker => {
                let contracts = required_symbols(Exchange::Gateio, request.channel, params)?
                    .into_iter()
                    .map(contract)
                    .collect();
                Ok((TICKERS_CHANNEL, contracts))
            }
        }
    }

    fn parse_result(&self, channel: &str, result: Value) -> Option<MarketEvent> {
        match channel {
            TICKERS_CHANNEL => {
                let first = first_entry(result)?;
                let ticker: GateTicker = serde_json::from_value(first).ok()?;
                Some(MarketEvent::Ticker(ticker.to_event()))
            }
            CANDLES_CHANNEL => {
                let first = first_entry(result)?;
                let candle: GateCandle = serde_json::from_value(first).ok()?;
                candle.to_event().map(MarketEvent::Kline)
            }
            ORDERBOOK_CHANNEL => {
                let book: GateOrderbook = serde_json::from_value(result).ok()?;
                Some(MarketEvent::Orderbook(book.to_event(current_time_ms())))
            }
            other => {
                tracing::trace!(exchange = "gateio", channel = %other, "Ignoring channel");
                None
            }
        }
    }
}

/// Tickers and candles arrive as arrays; only the first entry is surfaced
fn first_entry(result: Value) -> Option<Value> {
    match result {
        Value::Array(mut entries) if !entries.is_empty() => Some(entries.swap_remove(0)),
        Value::Object(_) => Some(result),
        _ => None,
    }
}

impl ProtocolAdapter for GateioAdapter {
    fn exchange(&self) -> Exchange {
        Exchange::Gateio
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
        let (channel, payload) = self.channel_and_payload(request)?;
        Ok(json!({
            "time": Self::now_secs(),
            "channel": channel,
            "event": request.op.as_str(),
            "payload": payload,
        })
        .to_string())
    }

    fn parse_message(&self, raw: &str) -> Option<MarketEvent> {
        let envelope: GateEnvelope = match serde_json::from_str(raw) {
            Ok(e) => e,
            Err(e) => {
                tracing::trace!(exchange = "gateio", error = %e, "Unparseable frame");
                return None;
            }
        };

        if let Some(error) = envelope.error.as_ref().filter(|e| !e.is_null()) {
            tracing::debug!(exchange = "gateio", error = %error, "Gate.io error frame");
            return None;
        }

        let event = envelope.event.as_deref()?;
        let channel = envelope.channel.as_deref()?;
        if !is_data_event(event) {
            tracing::debug!(exchange = "gateio", channel = %channel, event = %event, "Gate.io ack");
            return None;
        }

        self.parse_result(channel, envelope.result?)
    }

    fn heartbeat_message(&self) -> Option<String> {
        Some(
            json!({
                "time": Self::now_secs(),
                "channel": PING_CHANNEL,
            })
            .to_string(),
        )
    }
}

// =============================================================================
// Tests
// =============================================================================
