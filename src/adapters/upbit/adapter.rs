//! Upbit Adapter Implementation
//!
//! Every subscription message replaces the previous one on the socket, so
//! the adapter renders the whole desired set in a single envelope and has no
//! unsubscribe.
//!
//! Docs: https://global-docs.upbit.com/reference/websocket-guide

use serde_json::Value;

use crate::adapters::errors::{ExchangeError, ExchangeResult};
use crate::adapters::shared::krw::{self, TicketEnvelope};
use crate::adapters::traits::{
    required_interval, required_symbol, required_symbols, ProtocolAdapter,
};
use crate::adapters::types::{
    Channel, Exchange, MarketEvent, SubscriptionOp, SubscriptionPlan, SubscriptionRequest,
};

use super::config::UpbitConfig;
use super::types::{candle_unit, parse_candle, parse_ticker, CANDLE_PREFIX, FX_SYMBOL};

/// Upbit protocol adapter
pub struct UpbitAdapter {
    config: UpbitConfig,
    /// Ticket identifying this client; stable for the adapter's lifetime
    ticket: String,
}

impl UpbitAdapter {
    pub fn new(config: UpbitConfig) -> Self {
        Self {
            config,
            ticket: uuid::Uuid::new_v4().to_string(),
        }
    }

    pub fn ticket(&self) -> &str {
        &self.ticket
    }

    /// Candle codes: the symbol plus the USDT market for FX derivation
    fn candle_codes(symbol: &str) -> Vec<String> {
        let mut codes = vec![krw::market_code(symbol)];
        let fx = krw::market_code(FX_SYMBOL);
        if !codes.contains(&fx) {
            codes.push(fx);
        }
        codes
    }
}

impl ProtocolAdapter for UpbitAdapter {
    fn exchange(&self) -> Exchange {
        Exchange::Upbit
    }

    fn ws_url(&self) -> &str {
        self.config.ws_url()
    }

    fn supports(&self, _channel: Channel) -> bool {
        true
    }

    fn supports_unsubscribe(&self) -> bool {
        false
    }

    // Spot ticker carries no funding/mark data; only sent on explicit request
    fn ticker_by_default(&self) -> bool {
        false
    }

    fn request_message(&self, request: &SubscriptionRequest) -> ExchangeResult<String> {
        if request.op == SubscriptionOp::Unsubscribe {
            return Err(ExchangeError::UnsupportedOperation {
                exchange: "upbit",
                operation: "unsubscribe",
            });
        }

        let params = &request.params;
        let envelope = TicketEnvelope::new(&self.ticket);

        let envelope = match request.channel {
            Channel::Orderbook => {
                let codes = required_symbols(Exchange::Upbit, request.channel, params)?
                    .into_iter()
                    .map(krw::market_code)
                    .collect();
                envelope.channel("orderbook", codes)
            }
            Channel::Kline => {
                let symbol = required_symbol(Exchange::Upbit, request.channel, params)?;
                let interval = required_interval(Exchange::Upbit, request.channel, params)?;
                let kind = format!("{}{}", CANDLE_PREFIX, candle_unit(interval)?);
                envelope.channel(&kind, Self::candle_codes(symbol))
            }
            Channel::Ticker => {
                let codes = required_symbols(Exchange::Upbit, request.channel, params)?
                    .into_iter()
                    .map(krw::market_code)
                    .collect();
                envelope.channel("ticker", codes)
            }
        };

        Ok(envelope.finish())
    }

    fn parse_message(&self, raw: &str) -> Option<MarketEvent> {
        let value: Value = match serde_json::from_str(raw) {
            Ok(v) => v,
            Err(e) => {
                tracing::trace!(exchange = "upbit", error = %e, "Unparseable frame");
                return None;
            }
        };

        if let Some(error) = krw::error_message(&value) {
            tracing::debug!(exchange = "upbit", error = %error, "Upbit error frame");
            return None;
        }

        let kind = krw::message_type(&value)?;
        if kind == "orderbook" {
            krw::parse_orderbook(&value).map(MarketEvent::Orderbook)
        } else if kind.starts_with(CANDLE_PREFIX) {
            parse_candle(&value).map(MarketEvent::Kline)
        } else if kind == "ticker" {
            parse_ticker(&value).map(MarketEvent::Ticker)
        } else {
            tracing::trace!(exchange = "upbit", kind = %kind, "Ignoring frame");
            None
        }
    }

    fn heartbeat_message(&self) -> Option<String> {
        Some("PING".to_string())
    }

    fn plan_messages(&self, plan: &SubscriptionPlan) -> ExchangeResult<Vec<String>> {
        let mut envelope = TicketEnvelope::new(&self.ticket);

        let codes: Vec<String> = plan
            .orderbook_symbols()
            .iter()
            .map(|s| krw::market_code(s))
            .collect();
        if !codes.is_empty() {
            envelope = envelope.channel("orderbook", codes);
        }

        if let Some(focus) = &plan.focus {
            match candle_unit(plan.interval) {
                Ok(unit) => {
                    let kind = format!("{}{}", CANDLE_PREFIX, unit);
                    envelope = envelope.channel(&kind, Self::candle_codes(focus));
                }
                Err(e) => {
                    tracing::warn!(exchange = "upbit", error = %e, "Skipping candle channel");
                }
            }
        }

        if envelope.channel_count() == 0 {
            return Ok(Vec::new());
        }
        Ok(vec![envelope.finish()])
    }
}

// =============================================================================
// Tests
// =============================================================================
