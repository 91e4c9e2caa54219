//! Reconnection policy with exponential backoff
//!
//! Connection stores do NOT reconnect after an unexpected close unless the
//! policy is explicitly `Bounded`. The bounded variant retries with
//! exponential backoff plus jitter to avoid a thundering herd.

use serde::{Deserialize, Serialize};

use crate::adapters::errors::{ExchangeError, ExchangeResult};

/// Configuration for reconnection attempts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconnectConfig {
    /// Maximum number of reconnection attempts
    pub max_attempts: u32,
    /// Initial delay in milliseconds (doubles each attempt)
    pub initial_delay_ms: u64,
    /// Maximum delay cap in milliseconds
    pub max_delay_ms: u64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 500,
            max_delay_ms: 5000,
        }
    }
}

impl ReconnectConfig {
    /// Base backoff (without jitter) before attempt `attempt` (0-based)
    pub fn backoff_ms(&self, attempt: u32) -> u64 {
        let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
        std::cmp::min(self.initial_delay_ms.saturating_mul(factor), self.max_delay_ms)
    }
}

/// What a connection store does after the socket closes on its own
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ReconnectPolicy {
    /// Stay disconnected until the caller reconnects
    #[default]
    Disabled,
    /// Retry with backoff, giving up after `max_attempts`
    Bounded(ReconnectConfig),
}

/// Reconnect with exponential backoff and jitter
///
/// Backoff doubles from `initial_delay_ms` (500ms, 1000ms, 2000ms...) up to
/// `max_delay_ms`, plus 0-199ms of random jitter.
///
/// # Returns
/// * `Ok(())` - Reconnection successful
/// * `Err(ExchangeError)` - All attempts failed (the last error)
pub async fn reconnect_with_backoff<F, Fut>(
    config: &ReconnectConfig,
    exchange_name: &str,
    mut connect_fn: F,
) -> ExchangeResult<()>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = ExchangeResult<()>>,
{
    let mut last_error: Option<ExchangeError> = None;

    for attempt in 0..config.max_attempts {
        let jitter = rand::random::<u64>() % 200;
        let backoff_ms = config.backoff_ms(attempt) + jitter;

        tracing::info!(
            exchange = %exchange_name,
            attempt = attempt + 1,
            max_attempts = config.max_attempts,
            backoff_ms,
            "Reconnect attempt scheduled"
        );

        tokio::time::sleep(std::time::Duration::from_millis(backoff_ms)).await;

        match connect_fn().await {
            Ok(()) => return Ok(()),
            Err(e) => {
                tracing::warn!(
                    exchange = %exchange_name,
                    attempt = attempt + 1,
                    error = %e,
                    "Reconnect attempt failed"
                );
                last_error = Some(e);
            }
        }
    }

    Err(last_error.unwrap_or_else(|| {
        ExchangeError::ConnectionFailed("Reconnection failed after max attempts".into())
    }))
}
