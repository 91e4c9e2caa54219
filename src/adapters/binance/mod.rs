//! Binance exchange adapter module
//!
//! Spot streams. Requests are fully rendered; inbound parsing is not
//! implemented yet and every frame is dropped.

pub mod adapter;
pub mod config;

pub use adapter::BinanceAdapter;
pub use config::BinanceConfig;
