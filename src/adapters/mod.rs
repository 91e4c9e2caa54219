//! Exchange adapters for Upbit, Bithumb, Bybit, Gate.io and Binance
//!
//! This module provides the protocol abstraction (subscription messages in,
//! canonical events out) and the WebSocket transport shared by every
//! exchange connection.

pub mod binance;
pub mod bithumb;
pub mod bybit;
pub mod errors;
pub mod factory;
pub mod gateio;
pub mod shared;
pub mod traits;
pub mod types;
pub mod upbit;

// Re-export commonly used types for convenience
pub use errors::{ExchangeError, ExchangeResult};
pub use factory::{create_adapter, create_adapter_by_name, AnyAdapter, SUPPORTED_EXCHANGES};
pub use shared::{Connector, ReconnectConfig, ReconnectPolicy, TlsConnector, WsSession};
pub use traits::ProtocolAdapter;
pub use types::{
    CandleEvent, Channel, ConnectionState, ConnectionStatus, Exchange, Interval, MarketEvent,
    OrderBookEvent, OrderBookLevel, RequestParams, SubscriptionOp, SubscriptionPlan,
    SubscriptionRequest, TickerEvent,
};
