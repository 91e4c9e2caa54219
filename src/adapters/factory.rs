//! Adapter factory for dynamic exchange selection
//!
//! Creates protocol adapters from `Exchange` values or config strings.
//! Uses an enum-based dispatch pattern (no `Box<dyn>`) so the adapter is
//! resolved once per connection, not per message.

use crate::adapters::binance::{BinanceAdapter, BinanceConfig};
use crate::adapters::bithumb::{BithumbAdapter, BithumbConfig};
use crate::adapters::bybit::{BybitAdapter, BybitConfig};
use crate::adapters::errors::ExchangeResult;
use crate::adapters::gateio::{GateioAdapter, GateioConfig};
use crate::adapters::traits::ProtocolAdapter;
use crate::adapters::types::{
    Channel, Exchange, MarketEvent, SubscriptionPlan, SubscriptionRequest,
};
use crate::adapters::upbit::{UpbitAdapter, UpbitConfig};

// =============================================================================
// AnyAdapter: enum-based dispatch for dynamic exchange selection
// =============================================================================

/// Enum wrapping all concrete adapter types for runtime dispatch.
pub enum AnyAdapter {
    Upbit(UpbitAdapter),
    Bithumb(BithumbAdapter),
    Bybit(BybitAdapter),
    Gateio(GateioAdapter),
    Binance(BinanceAdapter),
}

/// Macro to reduce boilerplate for delegating trait methods
macro_rules! delegate {
    ($self:expr, $method:ident ( $($arg:expr),* )) => {
        match $self {
            AnyAdapter::Upbit(a) => a.$method($($arg),*),
            AnyAdapter::Bithumb(a) => a.$method($($arg),*),
            AnyAdapter::Bybit(a) => a.$method($($arg),*),
            AnyAdapter::Gateio(a) => a.$method($($arg),*),
            AnyAdapter::Binance(a) => a.$method($($arg),*),
        }
    };
}

impl ProtocolAdapter for AnyAdapter {
    fn exchange(&self) -> Exchange {
        delegate!(self, exchange())
    }

    fn ws_url(&self) -> &str {
        delegate!(self, ws_url())
    }

    fn supports(&self, channel: Channel) -> bool {
        delegate!(self, supports(channel))
    }

    fn supports_unsubscribe(&self) -> bool {
        delegate!(self, supports_unsubscribe())
    }

    fn ticker_by_default(&self) -> bool {
        delegate!(self, ticker_by_default())
    }

    fn request_message(&self, request: &SubscriptionRequest) -> ExchangeResult<String> {
        delegate!(self, request_message(request))
    }

    fn parse_message(&self, raw: &str) -> Option<MarketEvent> {
        delegate!(self, parse_message(raw))
    }

    fn heartbeat_message(&self) -> Option<String> {
        delegate!(self, heartbeat_message())
    }

    fn plan_messages(&self, plan: &SubscriptionPlan) -> ExchangeResult<Vec<String>> {
        delegate!(self, plan_messages(plan))
    }
}

// =============================================================================
// Factory Functions
// =============================================================================

/// All supported exchange adapter names.
pub const SUPPORTED_EXCHANGES: &[&str] = &["upbit", "bithumb", "bybit", "gateio", "binance"];

/// Create the adapter for an exchange, reading endpoint overrides from the
/// environment.
pub fn create_adapter(exchange: Exchange) -> AnyAdapter {
    match exchange {
        Exchange::Upbit => AnyAdapter::Upbit(UpbitAdapter::new(UpbitConfig::from_env())),
        Exchange::Bithumb => AnyAdapter::Bithumb(BithumbAdapter::new(BithumbConfig::from_env())),
        Exchange::Bybit => AnyAdapter::Bybit(BybitAdapter::new(BybitConfig::from_env())),
        Exchange::Gateio => AnyAdapter::Gateio(GateioAdapter::new(GateioConfig::from_env())),
        Exchange::Binance => AnyAdapter::Binance(BinanceAdapter::new(BinanceConfig::from_env())),
    }
}

/// Create an adapter from a config name string.
///
/// Names are matched case-insensitively. Unknown names fail with
/// `ExchangeError::UnknownExchange`.
pub fn create_adapter_by_name(name: &str) -> ExchangeResult<AnyAdapter> {
    let exchange: Exchange = name.parse()?;
    Ok(create_adapter(exchange))
}

// =============================================================================
// Tests
// =============================================================================
