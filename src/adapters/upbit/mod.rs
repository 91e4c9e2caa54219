//! Upbit exchange adapter module
//!
//! KRW spot market data (order book, candles, spot ticker) over Upbit's
//! ticket-based WebSocket protocol.

pub mod adapter;
pub mod config;
pub mod types;

pub use adapter::UpbitAdapter;
pub use config::UpbitConfig;
