//! Gate.io Configuration
//!
//! Configuration for the Gate.io USDT-settled futures WebSocket (v4).

/// USDT futures WebSocket URL
const MAINNET_WS_URL: &str = "wss://fx-ws.gateio.ws/v4/ws/usdt";

/// Configuration for Gate.io exchange connection (public market data)
#[derive(Debug, Clone)]
pub struct GateioConfig {
    /// WebSocket endpoint
    pub ws_url: String,
    /// Order book depth requested per contract
    pub orderbook_depth: u32,
}

impl Default for GateioConfig {
    fn default() -> Self {
        Self {
            ws_url: MAINNET_WS_URL.to_string(),
            orderbook_depth: 20,
        }
    }
}

impl GateioConfig {
    /// Create configuration from environment variables (`GATEIO_WS_URL`)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let ws_url = std::env::var("GATEIO_WS_URL")
            .ok()
            .filter(|url| !url.trim().is_empty())
            .unwrap_or(defaults.ws_url);

        Self {
            ws_url,
            orderbook_depth: defaults.orderbook_depth,
        }
    }

    pub fn ws_url(&self) -> &str {
        &self.ws_url
    }
}
