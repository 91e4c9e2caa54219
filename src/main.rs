//! Market-data streamer entry point
//!
//! 1. Loads configuration (`ARB_STREAM_CONFIG`, default `config.yaml`)
//! 2. Opens one connection per referenced exchange
//! 3. Logs every canonical event until Ctrl+C

use std::path::PathBuf;
use std::sync::Arc;

use tokio::signal;
use tokio::sync::broadcast;
use tracing::{error, info};

use arb_stream::adapters::{MarketEvent, TlsConnector};
use arb_stream::config::{self, logging::init_logging};
use arb_stream::core::Coordinator;

const CONFIG_ENV_VAR: &str = "ARB_STREAM_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config.yaml";

fn log_event(exchange: &str, event: &MarketEvent) {
    match event {
        MarketEvent::Ticker(t) => info!(
            exchange,
            symbol = %t.symbol,
            change_percent = ?t.change_percent,
            funding_rate = ?t.funding_rate,
            mark_price = ?t.mark_price,
            "[TICKER]"
        ),
        MarketEvent::Kline(c) => info!(
            exchange,
            symbol = %c.symbol,
            time_ms = c.time_ms,
            close = c.close,
            "[KLINE]"
        ),
        MarketEvent::Orderbook(o) => tracing::debug!(
            exchange,
            symbol = %o.symbol,
            best_bid = ?o.best_bid(),
            best_ask = ?o.best_ask(),
            "[ORDERBOOK]"
        ),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file (if it exists)
    dotenvy::dotenv().ok();

    init_logging();

    let path = std::env::var(CONFIG_ENV_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));
    info!(path = %path.display(), "[CONFIG] Loading configuration");

    let config = match config::load_config(&path) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("[CONFIG] Configuration failed: {}", e);
            return Err(e.into());
        }
    };

    let mut coordinator = Coordinator::new(Arc::new(TlsConnector))
        .with_reconnect_policy(config.reconnect.to_policy());
    coordinator
        .initialize(config.positions.clone(), config.interval, config.selection.clone())
        .await;

    for (exchange, store) in coordinator.get_all_stores() {
        let name = exchange.as_str();
        store.add_listener(move |event| log_event(name, event));
    }

    let (shutdown_tx, mut shutdown_rx) = broadcast::channel::<()>(1);
    let shutdown_signal = shutdown_tx.clone();
    tokio::spawn(async move {
        match signal::ctrl_c().await {
            Ok(()) => {
                info!("[SHUTDOWN] Graceful shutdown initiated");
                let _ = shutdown_signal.send(());
            }
            Err(err) => {
                error!("Failed to listen for Ctrl+C signal: {}", err);
            }
        }
    });

    info!(
        exchanges = coordinator.get_all_stores().len(),
        "Streaming. Press Ctrl+C to stop."
    );

    let _ = shutdown_rx.recv().await;

    coordinator.cleanup().await;
    info!("[SHUTDOWN] Clean exit");
    Ok(())
}
