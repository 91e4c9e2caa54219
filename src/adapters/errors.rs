//! Exchange adapter error types
//!
//! All exchange-related errors are wrapped in ExchangeError enum
//! which implements thiserror for consistent error handling.
//!
//! Configuration errors (`UnknownExchange`, `MissingParameter`,
//! `UnsupportedChannel`, `UnsupportedOperation`, `UnsupportedInterval`) are
//! caller bugs and are never retried. Transport errors close the session.

use thiserror::Error;

/// Exchange-specific error types for adapter and connection operations
#[derive(Error, Debug)]
pub enum ExchangeError {
    /// The adapter factory does not know this exchange identifier
    #[error("Unknown exchange: '{name}'. Supported: {supported}")]
    UnknownExchange { name: String, supported: String },

    /// A subscription request is missing a required parameter
    #[error("{exchange}: '{channel}' request requires parameter '{param}'")]
    MissingParameter {
        exchange: &'static str,
        channel: &'static str,
        param: &'static str,
    },

    /// The exchange does not offer this channel at all
    #[error("{exchange}: channel '{channel}' is not supported")]
    UnsupportedChannel {
        exchange: &'static str,
        channel: &'static str,
    },

    /// The exchange protocol has no such operation (e.g. unsubscribe)
    #[error("{exchange}: operation '{operation}' is not supported")]
    UnsupportedOperation {
        exchange: &'static str,
        operation: &'static str,
    },

    /// The exchange has no candle stream for this interval
    #[error("{exchange}: interval '{interval}' is not supported")]
    UnsupportedInterval {
        exchange: &'static str,
        interval: &'static str,
    },

    /// Connection to exchange failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Outbound frame could not be handed to the socket
    #[error("Send failed: {0}")]
    SendFailed(String),

    /// Invalid or unexpected response from exchange
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// WebSocket protocol error (boxed to reduce enum size)
    #[error("WebSocket error: {0}")]
    WebSocket(Box<tokio_tungstenite::tungstenite::Error>),
}

impl ExchangeError {
    /// True for errors that indicate a caller bug rather than a runtime fault
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            ExchangeError::UnknownExchange { .. }
                | ExchangeError::MissingParameter { .. }
                | ExchangeError::UnsupportedChannel { .. }
                | ExchangeError::UnsupportedOperation { .. }
                | ExchangeError::UnsupportedInterval { .. }
        )
    }
}

/// Result type alias for exchange operations
pub type ExchangeResult<T> = std::result::Result<T, ExchangeError>;
