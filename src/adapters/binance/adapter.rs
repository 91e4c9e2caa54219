//! Binance Adapter Implementation
//!
//! Requests: `{"method": "SUBSCRIBE"|"UNSUBSCRIBE", "params": [streams], "id": n}`
//!
//! Streams: `btcusdt@depth20@100ms`, `btcusdt@kline_1m`, `btcusdt@ticker`.
//!
//! Inbound parsing is incomplete: `parse_message` returns `None` for every
//! frame, so a Binance connection never emits events.

use serde_json::json;

use crate::adapters::errors::ExchangeResult;
use crate::adapters::traits::{required_interval, required_symbols, ProtocolAdapter};
use crate::adapters::types::{
    next_subscription_id, Channel, Exchange, MarketEvent, SubscriptionOp, SubscriptionRequest,
};

use super::config::BinanceConfig;

const QUOTE: &str = "usdt";

/// Binance protocol adapter
pub struct BinanceAdapter {
    config: BinanceConfig,
}

impl BinanceAdapter {
    pub fn new(config: BinanceConfig) -> Self {
        Self { config }
    }

    fn stream_symbol(symbol: &str) -> String {
        format!("{}{}", symbol.trim().to_ascii_lowercase(), QUOTE)
    }

    fn streams(request: &SubscriptionRequest) -> ExchangeResult<Vec<String>> {
        let params = &request.params;
        let symbols = required_symbols(Exchange::Binance, request.channel, params)?;

        let suffix = match request.channel {
            Channel::Orderbook => "@depth20@100ms".to_string(),
            Channel::Kline => {
                let interval = required_interval(Exchange::Binance, request.channel, params)?;
                format!("@kline_{}", interval.as_str())
            }
            Channel::Ticker => "@ticker".to_string(),
        };

        Ok(symbols
            .iter()
            .map(|s| format!("{}{}", Self::stream_symbol(s), suffix))
            .collect())
    }
}

impl ProtocolAdapter for BinanceAdapter {
    fn exchange(&self) -> Exchange {
        Exchange::Binance
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
        let method = match request.op {
            SubscriptionOp::Subscribe => "SUBSCRIBE",
            SubscriptionOp::Unsubscribe => "UNSUBSCRIBE",
        };
        Ok(json!({
            "method": method,
            "params": Self::streams(request)?,
            "id": next_subscription_id(),
        })
        .to_string())
    }

    // TODO: map depth/kline/24hrTicker payloads once Binance is used as a leg
    fn parse_message(&self, raw: &str) -> Option<MarketEvent> {
        tracing::trace!(exchange = "binance", len = raw.len(), "Dropping frame");
        None
    }
}
