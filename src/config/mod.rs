//! Configuration module for YAML loading and logging setup
//!
//! This module provides:
//! - Configuration types (`AppConfig`, `ReconnectSettings`)
//! - YAML loading functionality (`load_config`)
//! - Tracing subscriber setup (`logging::init_logging`)

mod loader;
pub mod logging;
mod types;

// Re-export types
pub use types::{AppConfig, ReconnectSettings};

// Re-export loader functions
pub use loader::{load_config, load_config_from_str};
