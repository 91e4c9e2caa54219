//! Bithumb Configuration
//!
//! Configuration for the Bithumb public WebSocket (v1, ticket protocol).

/// Public WebSocket URL
const MAINNET_WS_URL: &str = "wss://ws-api.bithumb.com/websocket/v1";

/// Configuration for Bithumb exchange connection (public market data)
#[derive(Debug, Clone)]
pub struct BithumbConfig {
    /// WebSocket endpoint
    pub ws_url: String,
}

impl Default for BithumbConfig {
    fn default() -> Self {
        Self {
            ws_url: MAINNET_WS_URL.to_string(),
        }
    }
}

impl BithumbConfig {
    /// Create configuration from environment variables (`BITHUMB_WS_URL`)
    pub fn from_env() -> Self {
        let ws_url = std::env::var("BITHUMB_WS_URL")
            .ok()
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| MAINNET_WS_URL.to_string());

        Self { ws_url }
    }

    pub fn ws_url(&self) -> &str {
        &self.ws_url
    }
}
