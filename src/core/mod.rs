//! Core module - connection stores, listener registry, coordinator
//!
//! This module uses **explicit re-exports** instead of glob exports
//! (`pub use module::*`) to keep the public API visible.
//!
//! ## Usage
//! ```ignore
//! use arb_stream::core::{Coordinator, Position, SelectedTicker};
//! ```

pub mod coordinator;
pub mod listeners;
pub mod store;
pub mod types;

#[cfg(test)]
pub(crate) mod test_utils;

// Explicit re-exports for coordinator module
pub use coordinator::{desired_symbols, position_symbols, selection_delta, Coordinator};

// Explicit re-exports for listeners module
pub use listeners::{Listener, ListenerId, ListenerRegistry};

// Explicit re-exports for store module
pub use store::{ConnectionStore, HEARTBEAT_INTERVAL, INTERVAL_CHANGE_RECONNECT_DELAY};

// Explicit re-exports for types module
pub use types::{normalize_symbol, Position, SelectedTicker};
