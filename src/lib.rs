//! Multi-exchange market-data streamer
//!
//! - Protocol adapters for Upbit, Bithumb, Bybit, Gate.io and Binance
//! - One connection store per exchange with buffered subscriptions
//! - A coordinator that keeps positions and the viewed instrument streaming

pub mod adapters;
pub mod config;
pub mod core;
pub mod error;

pub use error::{AppError, Result};
