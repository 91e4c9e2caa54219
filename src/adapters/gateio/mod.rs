//! Gate.io exchange adapter module
//!
//! USDT futures order book, candlesticks and tickers. Candle and ticker are
//! separate channels, each needing its own request.

pub mod adapter;
pub mod config;
pub mod types;

pub use adapter::GateioAdapter;
pub use config::GateioConfig;
