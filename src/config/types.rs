//! Configuration types for the market-data streamer
//!
//! Loaded from YAML. Positions and the optional selection are the initial
//! coordinator inputs; `reconnect` opts into bounded automatic reconnects.

use serde::{Deserialize, Serialize};

use crate::adapters::shared::{ReconnectConfig, ReconnectPolicy};
use crate::adapters::types::{Exchange, Interval};
use crate::core::types::{Position, SelectedTicker};
use crate::error::AppError;

// ============================================================================
// Configuration Structs
// ============================================================================

/// Automatic reconnect after an unexpected close. Off unless enabled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectSettings {
    pub enabled: bool,
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for ReconnectSettings {
    fn default() -> Self {
        let defaults = ReconnectConfig::default();
        Self {
            enabled: false,
            max_attempts: defaults.max_attempts,
            initial_delay_ms: defaults.initial_delay_ms,
            max_delay_ms: defaults.max_delay_ms,
        }
    }
}

impl ReconnectSettings {
    pub fn validate(&self) -> Result<(), AppError> {
        if !self.enabled {
            return Ok(());
        }
        if self.max_attempts == 0 {
            return Err(AppError::Config(
                "reconnect.max_attempts must be > 0 when reconnect is enabled".to_string(),
            ));
        }
        if self.initial_delay_ms == 0 {
            return Err(AppError::Config(
                "reconnect.initial_delay_ms must be > 0 when reconnect is enabled".to_string(),
            ));
        }
        if self.max_delay_ms < self.initial_delay_ms {
            return Err(AppError::Config(format!(
                "reconnect.max_delay_ms ({}) must be >= initial_delay_ms ({})",
                self.max_delay_ms, self.initial_delay_ms
            )));
        }
        Ok(())
    }

    pub fn to_policy(&self) -> ReconnectPolicy {
        if !self.enabled {
            return ReconnectPolicy::Disabled;
        }
        ReconnectPolicy::Bounded(ReconnectConfig {
            max_attempts: self.max_attempts,
            initial_delay_ms: self.initial_delay_ms,
            max_delay_ms: self.max_delay_ms,
        })
    }
}

/// Root application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// Candle interval for the selected instrument
    #[serde(default)]
    pub interval: Interval,
    /// Open positions whose order books must stream
    #[serde(default)]
    pub positions: Vec<Position>,
    /// Instrument viewed at startup
    #[serde(default, alias = "selected")]
    pub selection: Option<SelectedTicker>,
    #[serde(default)]
    pub reconnect: ReconnectSettings,
}

fn validate_legs(
    what: &str,
    symbol: &str,
    home: Exchange,
    counter: Exchange,
) -> Result<(), AppError> {
    // Rule: symbol cannot be empty
    if symbol.trim().is_empty() {
        return Err(AppError::Config(format!("{}: symbol cannot be empty", what)));
    }

    // Rule: home ≠ counter
    if home == counter {
        return Err(AppError::Config(format!(
            "{} '{}': home_exchange and counter_exchange cannot be the same (both are {})",
            what, symbol, home
        )));
    }
    Ok(())
}

impl AppConfig {
    /// Validate all configuration rules
    pub fn validate(&self) -> Result<(), AppError> {
        // Rule: something must be streamed
        if self.positions.is_empty() && self.selection.is_none() {
            return Err(AppError::Config(
                "Configuration must contain at least one position or a selection".to_string(),
            ));
        }

        for position in &self.positions {
            validate_legs(
                "Position",
                &position.symbol,
                position.home_exchange,
                position.counter_exchange,
            )?;
        }

        if let Some(selection) = &self.selection {
            validate_legs(
                "Selection",
                &selection.symbol,
                selection.home_exchange,
                selection.counter_exchange,
            )?;
        }

        self.reconnect.validate()
    }
}

// ============================================================================
// Tests
// ============================================================================
