//! Bybit exchange adapter module
//!
//! USDT perpetual order book, kline and ticker (funding/mark/index) topics.

pub mod adapter;
pub mod config;
pub mod types;

pub use adapter::BybitAdapter;
pub use config::BybitConfig;
