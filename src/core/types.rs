//! Coordinator input types
//!
//! Positions come from the position tracker, the selection from the UI.
//! Both name one symbol traded on two exchanges (the legs).

use serde::{Deserialize, Serialize};

use crate::adapters::types::Exchange;

/// Normalized base-asset symbol: trimmed, upper case
pub fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_ascii_uppercase()
}

/// An open cross-exchange position
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub home_exchange: Exchange,
    pub counter_exchange: Exchange,
}

impl Position {
    pub fn new(symbol: &str, home_exchange: Exchange, counter_exchange: Exchange) -> Self {
        Self {
            symbol: normalize_symbol(symbol),
            home_exchange,
            counter_exchange,
        }
    }

    pub fn legs(&self) -> [Exchange; 2] {
        [self.home_exchange, self.counter_exchange]
    }
}

/// Instrument the user is viewing, independent of open positions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedTicker {
    pub symbol: String,
    pub home_exchange: Exchange,
    pub counter_exchange: Exchange,
}

impl SelectedTicker {
    pub fn new(symbol: &str, home_exchange: Exchange, counter_exchange: Exchange) -> Self {
        Self {
            symbol: normalize_symbol(symbol),
            home_exchange,
            counter_exchange,
        }
    }

    pub fn legs(&self) -> [Exchange; 2] {
        [self.home_exchange, self.counter_exchange]
    }

    pub fn involves(&self, exchange: Exchange) -> bool {
        self.home_exchange == exchange || self.counter_exchange == exchange
    }
}
