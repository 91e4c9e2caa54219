//! Upbit Configuration
//!
//! Configuration for the Upbit public quotation WebSocket.

// =============================================================================
// Constants
// =============================================================================

/// Public quotation WebSocket URL
const MAINNET_WS_URL: &str = "wss://api.upbit.com/websocket/v1";

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for Upbit exchange connection (public market data)
#[derive(Debug, Clone)]
pub struct UpbitConfig {
    /// WebSocket endpoint
    pub ws_url: String,
}

impl Default for UpbitConfig {
    fn default() -> Self {
        Self {
            ws_url: MAINNET_WS_URL.to_string(),
        }
    }
}

impl UpbitConfig {
    /// Create configuration from environment variables (`UPBIT_WS_URL`)
    pub fn from_env() -> Self {
        let ws_url = std::env::var("UPBIT_WS_URL")
            .ok()
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| MAINNET_WS_URL.to_string());

        Self { ws_url }
    }

    /// Get WebSocket URL
    pub fn ws_url(&self) -> &str {
        &self.ws_url
    }
}
