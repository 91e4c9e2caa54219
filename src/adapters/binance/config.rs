//! Binance Configuration
//!
//! Spot combined-stream endpoint. Futures streams are not wired up.

/// Spot WebSocket URL
const MAINNET_WS_URL: &str = "wss://stream.binance.com:9443/ws";

/// Configuration for Binance exchange connection (public market data)
#[derive(Debug, Clone)]
pub struct BinanceConfig {
    /// WebSocket endpoint
    pub ws_url: String,
}

impl Default for BinanceConfig {
    fn default() -> Self {
        Self {
            ws_url: MAINNET_WS_URL.to_string(),
        }
    }
}

impl BinanceConfig {
    /// Create configuration from environment variables (`BINANCE_WS_URL`)
    pub fn from_env() -> Self {
        let ws_url = std::env::var("BINANCE_WS_URL")
            .ok()
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| MAINNET_WS_URL.to_string());

        Self { ws_url }
    }

    pub fn ws_url(&self) -> &str {
        &self.ws_url
    }
}
