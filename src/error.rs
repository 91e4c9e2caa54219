//! Application-wide error types using thiserror
//!
//! Adapter and transport failures stay `ExchangeError`; everything the
//! binary and config layer can fail with is wrapped in `AppError`.

use crate::adapters::errors::ExchangeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Exchange error: {0}")]
    Exchange(#[from] ExchangeError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;
