//! Bithumb Adapter Implementation
//!
//! Same envelope as Upbit, order book only. Candle and ticker requests are
//! rejected as unsupported channels.

use serde_json::Value;

use crate::adapters::errors::{ExchangeError, ExchangeResult};
use crate::adapters::shared::krw::{self, TicketEnvelope};
use crate::adapters::traits::{required_symbols, ProtocolAdapter};
use crate::adapters::types::{
    Channel, Exchange, MarketEvent, SubscriptionOp, SubscriptionPlan, SubscriptionRequest,
};

use super::config::BithumbConfig;

/// Bithumb protocol adapter
pub struct BithumbAdapter {
    config: BithumbConfig,
    ticket: String,
}

impl BithumbAdapter {
    pub fn new(config: BithumbConfig) -> Self {
        Self {
            config,
            ticket: uuid::Uuid::new_v4().to_string(),
        }
    }
}

impl ProtocolAdapter for BithumbAdapter {
    fn exchange(&self) -> Exchange {
        Exchange::Bithumb
    }

    fn ws_url(&self) -> &str {
        self.config.ws_url()
    }

    fn supports(&self, channel: Channel) -> bool {
        channel == Channel::Orderbook
    }

    fn supports_unsubscribe(&self) -> bool {
        false
    }

    fn request_message(&self, request: &SubscriptionRequest) -> ExchangeResult<String> {
        if request.op == SubscriptionOp::Unsubscribe {
            return Err(ExchangeError::UnsupportedOperation {
                exchange: "bithumb",
                operation: "unsubscribe",
            });
        }
        if !self.supports(request.channel) {
            return Err(ExchangeError::UnsupportedChannel {
                exchange: "bithumb",
                channel: request.channel.as_str(),
            });
        }

        let codes = required_symbols(Exchange::Bithumb, request.channel, &request.params)?
            .into_iter()
            .map(krw::market_code)
            .collect();

        Ok(TicketEnvelope::new(&self.ticket)
            .channel("orderbook", codes)
            .finish())
    }

    fn parse_message(&self, raw: &str) -> Option<MarketEvent> {
        let value: Value = match serde_json::from_str(raw) {
            Ok(v) => v,
            Err(e) => {
                tracing::trace!(exchange = "bithumb", error = %e, "Unparseable frame");
                return None;
            }
        };

        if let Some(error) = krw::error_message(&value) {
            tracing::debug!(exchange = "bithumb", error = %error, "Bithumb error frame");
            return None;
        }

        match krw::message_type(&value)? {
            "orderbook" => krw::parse_orderbook(&value).map(MarketEvent::Orderbook),
            _ => None,
        }
    }

    fn heartbeat_message(&self) -> Option<String> {
        Some("PING".to_string())
    }

    fn plan_messages(&self, plan: &SubscriptionPlan) -> ExchangeResult<Vec<String>> {
        let codes: Vec<String> = plan
            .orderbook_symbols()
            .iter()
            .map(|s| krw::market_code(s))
            .collect();
        if codes.is_empty() {
            return Ok(Vec::new());
        }

        Ok(vec![TicketEnvelope::new(&self.ticket)
            .channel("orderbook", codes)
            .finish()])
    }
}
