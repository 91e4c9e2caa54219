//! Bithumb exchange adapter module
//!
//! KRW order-book data only; Bithumb's ticket protocol offers no candle
//! channel to this layer.

pub mod adapter;
pub mod config;

pub use adapter::BithumbAdapter;
pub use config::BithumbConfig;
