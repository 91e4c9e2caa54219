//! Bybit Configuration
//!
//! Configuration for the Bybit v5 public linear (USDT perpetual) stream.

/// Public linear stream URL
const MAINNET_WS_URL: &str = "wss://stream.bybit.com/v5/public/linear";

/// Configuration for Bybit exchange connection (public market data)
#[derive(Debug, Clone)]
pub struct BybitConfig {
    /// WebSocket endpoint
    pub ws_url: String,
    /// Order book depth topic (1, 50, 200, 500)
    pub orderbook_depth: u32,
}

impl Default for BybitConfig {
    fn default() -> Self {
        Self {
            ws_url: MAINNET_WS_URL.to_string(),
            orderbook_depth: 50,
        }
    }
}

impl BybitConfig {
    /// Create configuration from environment variables
    /// (`BYBIT_WS_URL`, `BYBIT_ORDERBOOK_DEPTH`)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let ws_url = std::env::var("BYBIT_WS_URL")
            .ok()
            .filter(|url| !url.trim().is_empty())
            .unwrap_or(defaults.ws_url);
        let orderbook_depth = std::env::var("BYBIT_ORDERBOOK_DEPTH")
            .ok()
            .and_then(|d| d.parse::<u32>().ok())
            .filter(|d| matches!(d, 1 | 50 | 200 | 500))
            .unwrap_or(defaults.orderbook_depth);

        Self {
            ws_url,
            orderbook_depth,
        }
    }

    pub fn ws_url(&self) -> &str {
        &self.ws_url
    }
}
