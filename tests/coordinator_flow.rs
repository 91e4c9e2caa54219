//! End-to-end coordinator tests over an in-memory connector
//!
//! Every exchange uses its real adapter; only the socket is replaced, so the
//! assertions are on the exact frames each venue would receive.
//!
//! # Running the tests
//! ```bash
//! cargo test --test coordinator_flow
//! ```

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;

use arb_stream::adapters::errors::{ExchangeError, ExchangeResult};
use arb_stream::adapters::{
    create_adapter, Channel, Connector, ConnectionState, Exchange, Interval, MarketEvent,
    ProtocolAdapter, ReconnectPolicy, RequestParams, SubscriptionPlan, SubscriptionRequest,
    WsSession,
};
use arb_stream::core::{ConnectionStore, Coordinator, Position, SelectedTicker};

// =============================================================================
// Mock connector
// =============================================================================

struct MockSession {
    url: String,
    outbound: Option<mpsc::Receiver<String>>,
    inbound: mpsc::Sender<String>,
}

/// Hands out in-memory sessions and records every frame written to them
#[derive(Default)]
struct MockConnector {
    sessions: Mutex<Vec<MockSession>>,
    refuse: AtomicBool,
}

impl MockConnector {
    fn open_count(&self, url: &str) -> usize {
        self.sessions
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.url == url)
            .count()
    }

    fn frames(&self, url: &str) -> Vec<String> {
        let mut sessions = self.sessions.lock().unwrap();
        let mut frames = Vec::new();
        for session in sessions.iter_mut().filter(|s| s.url == url) {
            let Some(outbound) = session.outbound.as_mut() else {
                continue;
            };
            while let Ok(frame) = outbound.try_recv() {
                frames.push(frame);
            }
        }
        frames
    }

    /// The latest socket for `url` stops accepting frames
    fn drop_writer(&self, url: &str) {
        let mut sessions = self.sessions.lock().unwrap();
        if let Some(session) = sessions.iter_mut().rev().find(|s| s.url == url) {
            session.outbound = None;
        }
    }

    async fn push(&self, url: &str, raw: &str) {
        let sender = self
            .sessions
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|s| s.url == url)
            .map(|s| s.inbound.clone())
            .expect("no session for url");
        sender.send(raw.to_string()).await.unwrap();
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn open(&self, url: &str) -> ExchangeResult<WsSession> {
        if self.refuse.load(Ordering::SeqCst) {
            return Err(ExchangeError::ConnectionFailed(format!("refused: {}", url)));
        }
        let (out_tx, out_rx) = mpsc::channel(256);
        let (in_tx, in_rx) = mpsc::channel(256);
        self.sessions.lock().unwrap().push(MockSession {
            url: url.to_string(),
            outbound: Some(out_rx),
            inbound: in_tx,
        });
        Ok(WsSession::new(out_tx, in_rx))
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn url(exchange: Exchange) -> String {
    create_adapter(exchange).ws_url().to_string()
}

fn setup() -> (Arc<MockConnector>, Coordinator) {
    let connector = Arc::new(MockConnector::default());
    let coordinator = Coordinator::new(connector.clone());
    (connector, coordinator)
}

fn set(symbols: &[&str]) -> BTreeSet<String> {
    symbols.iter().map(|s| s.to_string()).collect()
}

fn json(frame: &str) -> Value {
    serde_json::from_str(frame).unwrap()
}

/// `[{ticket}, {type, codes}..., {format}]` → codes of the `kind` section
fn envelope_codes(frame: &str, kind: &str) -> Vec<String> {
    json(frame)
        .as_array()
        .unwrap()
        .iter()
        .find(|section| section["type"] == kind)
        .map(|section| {
            section["codes"]
                .as_array()
                .unwrap()
                .iter()
                .map(|c| c.as_str().unwrap().to_string())
                .collect()
        })
        .unwrap_or_default()
}

/// Bybit frames as `"op arg"`
fn bybit_ops(frames: &[String]) -> Vec<String> {
    frames
        .iter()
        .map(|f| {
            let v = json(f);
            let args: Vec<&str> = v["args"]
                .as_array()
                .unwrap()
                .iter()
                .map(|a| a.as_str().unwrap())
                .collect();
            format!("{} {}", v["op"].as_str().unwrap(), args.join(","))
        })
        .collect()
}

/// Gate.io frames as `"event channel payload"`, ignoring the timestamp
fn gate_ops(frames: &[String]) -> Vec<String> {
    frames
        .iter()
        .map(|f| {
            let v = json(f);
            let payload: Vec<&str> = v["payload"]
                .as_array()
                .unwrap()
                .iter()
                .map(|a| a.as_str().unwrap())
                .collect();
            format!(
                "{} {} {}",
                v["event"].as_str().unwrap(),
                v["channel"].as_str().unwrap(),
                payload.join(",")
            )
        })
        .collect()
}

/// Parsed frames without a per-request field (Gate.io `time`, Binance `id`)
fn without_field(frames: &[String], field: &str) -> Vec<Value> {
    frames
        .iter()
        .map(|f| {
            let mut v = json(f);
            if let Some(object) = v.as_object_mut() {
                object.remove(field);
            }
            v
        })
        .collect()
}

async fn wait_until<F: Fn() -> bool>(condition: F) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition not reached");
}

// =============================================================================
// Tests
// =============================================================================

#[tokio::test]
async fn test_selection_adds_only_the_exchanges_it_references() {
    let (connector, mut coordinator) = setup();
    let bithumb = url(Exchange::Bithumb);
    let bybit = url(Exchange::Bybit);
    let gateio = url(Exchange::Gateio);

    coordinator
        .initialize(
            vec![Position::new("BTC", Exchange::Bithumb, Exchange::Bybit)],
            Interval::OneMinute,
            None,
        )
        .await;

    assert_eq!(coordinator.get_all_stores().len(), 2);
    for exchange in [Exchange::Bithumb, Exchange::Bybit] {
        assert!(coordinator.get_store(exchange).unwrap().is_connected());
        assert_eq!(coordinator.exchange_symbols(exchange), Some(&set(&["BTC"])));
    }

    let bithumb_frames = connector.frames(&bithumb);
    assert_eq!(bithumb_frames.len(), 1);
    assert_eq!(envelope_codes(&bithumb_frames[0], "orderbook"), vec!["KRW-BTC"]);
    assert_eq!(
        bybit_ops(&connector.frames(&bybit)),
        vec!["subscribe orderbook.50.BTCUSDT"]
    );

    coordinator
        .update_selected_ticker_item(
            Some(SelectedTicker::new("ETH", Exchange::Bithumb, Exchange::Gateio)),
            Interval::OneMinute,
        )
        .await
        .unwrap();

    // Overwrite venue: one frame carrying the whole set
    let bithumb_frames = connector.frames(&bithumb);
    assert_eq!(bithumb_frames.len(), 1);
    assert_eq!(
        envelope_codes(&bithumb_frames[0], "orderbook"),
        vec!["KRW-BTC", "KRW-ETH"]
    );
    assert_eq!(
        coordinator.exchange_symbols(Exchange::Bithumb),
        Some(&set(&["BTC", "ETH"]))
    );

    // New connection for the counter leg
    let gate_store = coordinator.get_store(Exchange::Gateio).unwrap();
    assert!(gate_store.is_connected());
    assert_eq!(
        gate_ops(&connector.frames(&gateio)),
        vec![
            "subscribe futures.order_book ETH_USDT,20,0",
            "subscribe futures.candlesticks 1m,ETH_USDT",
            "subscribe futures.tickers ETH_USDT",
        ]
    );
    assert_eq!(coordinator.exchange_symbols(Exchange::Gateio), Some(&set(&["ETH"])));

    // Untouched
    assert!(connector.frames(&bybit).is_empty());
    assert_eq!(connector.open_count(&bybit), 1);
    assert!(coordinator.get_store(Exchange::Bybit).unwrap().is_connected());
    assert_eq!(coordinator.exchange_symbols(Exchange::Bybit), Some(&set(&["BTC"])));
}

/// Bybit and Upbit frames carry no per-request stamp, so they repeat byte for byte
#[tokio::test]
async fn test_repeated_interval_update_sends_identical_frames() {
    let (connector, mut coordinator) = setup();
    let upbit = url(Exchange::Upbit);
    let bybit = url(Exchange::Bybit);

    coordinator
        .initialize(
            vec![Position::new("BTC", Exchange::Upbit, Exchange::Bybit)],
            Interval::OneMinute,
            Some(SelectedTicker::new("ETH", Exchange::Upbit, Exchange::Bybit)),
        )
        .await;
    connector.frames(&upbit);
    connector.frames(&bybit);

    // Changing the interval drops the old candle first
    coordinator.update_interval(Interval::OneHour).await.unwrap();
    let first_bybit = bybit_ops(&connector.frames(&bybit));
    assert_eq!(first_bybit[0], "unsubscribe kline.1.ETHUSDT");
    assert!(first_bybit.contains(&"subscribe kline.60.ETHUSDT".to_string()));
    connector.frames(&upbit);

    coordinator.update_interval(Interval::OneHour).await.unwrap();
    let bybit_a = connector.frames(&bybit);
    let upbit_a = connector.frames(&upbit);

    coordinator.update_interval(Interval::OneHour).await.unwrap();
    let bybit_b = connector.frames(&bybit);
    let upbit_b = connector.frames(&upbit);

    assert_eq!(bybit_a, bybit_b);
    assert_eq!(upbit_a, upbit_b);
    assert_eq!(
        bybit_ops(&bybit_a),
        vec![
            "subscribe orderbook.50.BTCUSDT",
            "subscribe orderbook.50.ETHUSDT",
            "subscribe kline.60.ETHUSDT",
            "subscribe tickers.ETHUSDT",
        ]
    );
    assert_eq!(upbit_a.len(), 1);
    assert_eq!(
        envelope_codes(&upbit_a[0], "candle.60m"),
        vec!["KRW-ETH", "KRW-USDT"]
    );
    assert_eq!(coordinator.interval(), Interval::OneHour);
}

/// Gate.io stamps each request with `time` and Binance with a fresh `id`;
/// apart from those the repeated frames must match
#[tokio::test]
async fn test_repeated_interval_update_matches_apart_from_request_stamps() {
    let (connector, mut coordinator) = setup();
    let gateio = url(Exchange::Gateio);
    let binance = url(Exchange::Binance);

    coordinator
        .initialize(
            vec![Position::new("BTC", Exchange::Gateio, Exchange::Binance)],
            Interval::OneMinute,
            Some(SelectedTicker::new("ETH", Exchange::Gateio, Exchange::Binance)),
        )
        .await;
    coordinator.update_interval(Interval::FifteenMinutes).await.unwrap();
    connector.frames(&gateio);
    connector.frames(&binance);

    coordinator.update_interval(Interval::FifteenMinutes).await.unwrap();
    let gate_a = connector.frames(&gateio);
    let binance_a = connector.frames(&binance);

    coordinator.update_interval(Interval::FifteenMinutes).await.unwrap();
    let gate_b = connector.frames(&gateio);
    let binance_b = connector.frames(&binance);

    assert!(!gate_a.is_empty());
    assert!(!binance_a.is_empty());
    assert_eq!(without_field(&gate_a, "time"), without_field(&gate_b, "time"));
    assert_eq!(without_field(&binance_a, "id"), without_field(&binance_b, "id"));
    assert_eq!(
        gate_ops(&gate_a),
        vec![
            "subscribe futures.order_book BTC_USDT,20,0",
            "subscribe futures.order_book ETH_USDT,20,0",
            "subscribe futures.candlesticks 15m,ETH_USDT",
            "subscribe futures.tickers ETH_USDT",
        ]
    );

    let ids = |frames: &[String]| -> Vec<u64> {
        frames.iter().map(|f| json(f)["id"].as_u64().unwrap()).collect()
    };
    let (first, second) = (ids(&binance_a), ids(&binance_b));
    assert!(first.iter().max() < second.iter().min());
}

#[tokio::test]
async fn test_positions_sharing_a_symbol_subscribe_it_once() {
    let (connector, mut coordinator) = setup();
    let upbit = url(Exchange::Upbit);

    coordinator
        .initialize(
            vec![
                Position::new("BTC", Exchange::Upbit, Exchange::Bybit),
                Position::new(" btc ", Exchange::Upbit, Exchange::Gateio),
            ],
            Interval::OneMinute,
            None,
        )
        .await;

    assert_eq!(coordinator.get_all_stores().len(), 3);
    assert_eq!(coordinator.exchange_symbols(Exchange::Upbit), Some(&set(&["BTC"])));
    let frames = connector.frames(&upbit);
    assert_eq!(frames.len(), 1);
    assert_eq!(envelope_codes(&frames[0], "orderbook"), vec!["KRW-BTC"]);
}

#[tokio::test]
async fn test_selection_churn_keeps_position_symbols() {
    let (connector, mut coordinator) = setup();
    let upbit = url(Exchange::Upbit);
    let gateio = url(Exchange::Gateio);

    coordinator
        .initialize(
            vec![Position::new("BTC", Exchange::Upbit, Exchange::Bybit)],
            Interval::OneMinute,
            None,
        )
        .await;

    for symbol in ["ETH", "BTC", "XRP"] {
        coordinator
            .update_selected_ticker_item(
                Some(SelectedTicker::new(symbol, Exchange::Upbit, Exchange::Gateio)),
                Interval::OneMinute,
            )
            .await
            .unwrap();
        let symbols = coordinator.exchange_symbols(Exchange::Upbit).unwrap();
        assert!(symbols.contains("BTC"), "BTC dropped after selecting {}", symbol);
    }

    assert_eq!(
        coordinator.exchange_symbols(Exchange::Upbit),
        Some(&set(&["BTC", "XRP"]))
    );
    let last_upbit = connector.frames(&upbit).pop().unwrap();
    assert_eq!(envelope_codes(&last_upbit, "orderbook"), vec!["KRW-BTC", "KRW-XRP"]);

    // Gate.io only ever held the selection
    assert_eq!(coordinator.exchange_symbols(Exchange::Gateio), Some(&set(&["XRP"])));
    let gate = gate_ops(&connector.frames(&gateio));
    assert!(gate.contains(&"unsubscribe futures.order_book BTC_USDT,20,0".to_string()));
    assert_eq!(gate.last().unwrap(), "subscribe futures.order_book XRP_USDT,20,0");
}

#[tokio::test]
async fn test_exchange_left_by_selection_stays_for_positions() {
    let (connector, mut coordinator) = setup();
    let bybit = url(Exchange::Bybit);

    coordinator
        .initialize(
            vec![Position::new("BTC", Exchange::Upbit, Exchange::Bybit)],
            Interval::OneMinute,
            Some(SelectedTicker::new("ETH", Exchange::Upbit, Exchange::Bybit)),
        )
        .await;
    assert_eq!(coordinator.exchange_symbols(Exchange::Bybit), Some(&set(&["BTC", "ETH"])));
    connector.frames(&bybit);

    coordinator
        .update_selected_ticker_item(
            Some(SelectedTicker::new("ETH", Exchange::Upbit, Exchange::Gateio)),
            Interval::OneMinute,
        )
        .await
        .unwrap();

    let store = coordinator.get_store(Exchange::Bybit).unwrap();
    assert!(store.is_connected());
    assert_eq!(store.focus().await, None);
    assert_eq!(connector.open_count(&bybit), 1);
    assert_eq!(coordinator.exchange_symbols(Exchange::Bybit), Some(&set(&["BTC"])));
    assert_eq!(
        bybit_ops(&connector.frames(&bybit)),
        vec![
            "unsubscribe kline.1.ETHUSDT",
            "unsubscribe tickers.ETHUSDT",
            "unsubscribe orderbook.50.ETHUSDT",
        ]
    );

    // Leaving a focus the position also holds keeps its order book
    coordinator
        .update_selected_ticker_item(
            Some(SelectedTicker::new("BTC", Exchange::Upbit, Exchange::Bybit)),
            Interval::OneMinute,
        )
        .await
        .unwrap();
    assert_eq!(
        bybit_ops(&connector.frames(&bybit)),
        vec!["subscribe kline.1.BTCUSDT", "subscribe tickers.BTCUSDT"]
    );

    coordinator
        .update_selected_ticker_item(
            Some(SelectedTicker::new("BTC", Exchange::Upbit, Exchange::Gateio)),
            Interval::OneMinute,
        )
        .await
        .unwrap();
    assert_eq!(
        bybit_ops(&connector.frames(&bybit)),
        vec!["unsubscribe kline.1.BTCUSDT", "unsubscribe tickers.BTCUSDT"]
    );
    assert_eq!(coordinator.exchange_symbols(Exchange::Bybit), Some(&set(&["BTC"])));
    assert_eq!(connector.open_count(&bybit), 1);
}

#[tokio::test]
async fn test_dead_socket_does_not_stop_other_exchanges() {
    let (connector, mut coordinator) = setup();
    let upbit = url(Exchange::Upbit);
    let gateio = url(Exchange::Gateio);

    coordinator
        .initialize(
            vec![Position::new("BTC", Exchange::Upbit, Exchange::Bybit)],
            Interval::OneMinute,
            None,
        )
        .await;
    connector.frames(&upbit);
    connector.drop_writer(&upbit);

    coordinator
        .update_selected_ticker_item(
            Some(SelectedTicker::new("ETH", Exchange::Upbit, Exchange::Gateio)),
            Interval::OneMinute,
        )
        .await
        .unwrap();

    // Later exchanges still reconciled, selection committed
    assert_eq!(coordinator.selected().map(|s| s.symbol.as_str()), Some("ETH"));
    assert!(coordinator.get_store(Exchange::Gateio).unwrap().is_connected());
    assert_eq!(
        gate_ops(&connector.frames(&gateio)),
        vec![
            "subscribe futures.order_book ETH_USDT,20,0",
            "subscribe futures.candlesticks 1m,ETH_USDT",
            "subscribe futures.tickers ETH_USDT",
        ]
    );

    // The dead Upbit session is dropped and its next socket gets the full set
    let upbit_store = coordinator.get_store(Exchange::Upbit).unwrap();
    assert!(!upbit_store.is_connected());
    assert_eq!(
        coordinator.exchange_symbols(Exchange::Upbit),
        Some(&set(&["BTC", "ETH"]))
    );
    upbit_store.connect().await.unwrap();
    assert_eq!(connector.open_count(&upbit), 2);
    let frames = connector.frames(&upbit);
    assert_eq!(frames.len(), 1);
    assert_eq!(envelope_codes(&frames[0], "orderbook"), vec!["KRW-BTC", "KRW-ETH"]);
}

#[tokio::test]
async fn test_dead_socket_during_interval_change_is_reset() {
    let (connector, mut coordinator) = setup();
    let upbit = url(Exchange::Upbit);
    let bybit = url(Exchange::Bybit);

    coordinator
        .initialize(
            vec![Position::new("BTC", Exchange::Upbit, Exchange::Bybit)],
            Interval::OneMinute,
            Some(SelectedTicker::new("ETH", Exchange::Upbit, Exchange::Bybit)),
        )
        .await;
    connector.frames(&bybit);
    connector.drop_writer(&upbit);

    coordinator.update_interval(Interval::OneHour).await.unwrap();

    assert!(!coordinator.get_store(Exchange::Upbit).unwrap().is_connected());
    assert_eq!(
        bybit_ops(&connector.frames(&bybit))[0],
        "unsubscribe kline.1.ETHUSDT"
    );
    assert_eq!(coordinator.interval(), Interval::OneHour);
}

#[tokio::test]
async fn test_requests_buffered_while_disconnected_flush_in_order() {
    let connector = Arc::new(MockConnector::default());
    let gateio = url(Exchange::Gateio);
    let store = ConnectionStore::new(
        create_adapter(Exchange::Gateio),
        SubscriptionPlan::new(set(&["BTC"]), None, Interval::OneMinute),
        connector.clone(),
        ReconnectPolicy::Disabled,
    );

    store
        .send(SubscriptionRequest::subscribe(
            Channel::Ticker,
            RequestParams::for_symbol("SOL"),
        ))
        .await
        .unwrap();
    store
        .send(SubscriptionRequest::subscribe(
            Channel::Kline,
            RequestParams::for_symbol("SOL").with_interval(Interval::FiveMinutes),
        ))
        .await
        .unwrap();
    store
        .send(SubscriptionRequest::unsubscribe(
            Channel::Ticker,
            RequestParams::for_symbol("SOL"),
        ))
        .await
        .unwrap();
    assert_eq!(connector.open_count(&gateio), 0);

    store.connect().await.unwrap();
    assert_eq!(
        gate_ops(&connector.frames(&gateio)),
        vec![
            "subscribe futures.tickers SOL_USDT",
            "subscribe futures.candlesticks 5m,SOL_USDT",
            "unsubscribe futures.tickers SOL_USDT",
            "subscribe futures.order_book BTC_USDT,20,0",
        ]
    );
}

#[tokio::test]
async fn test_exchange_released_when_nothing_references_it() {
    let (connector, mut coordinator) = setup();
    let bybit = url(Exchange::Bybit);

    coordinator
        .initialize(
            Vec::new(),
            Interval::OneMinute,
            Some(SelectedTicker::new("ETH", Exchange::Upbit, Exchange::Bybit)),
        )
        .await;
    let bybit_status = coordinator.get_store(Exchange::Bybit).unwrap().watch_status();
    connector.frames(&bybit);

    coordinator
        .update_selected_ticker_item(
            Some(SelectedTicker::new("ETH", Exchange::Upbit, Exchange::Gateio)),
            Interval::OneMinute,
        )
        .await
        .unwrap();

    assert!(coordinator.get_store(Exchange::Bybit).is_none());
    assert!(coordinator.exchange_symbols(Exchange::Bybit).is_none());
    assert_eq!(bybit_status.borrow().state, ConnectionState::Disconnected);
    assert!(connector.frames(&bybit).is_empty());

    coordinator
        .update_selected_ticker_item(None, Interval::OneMinute)
        .await
        .unwrap();
    assert!(coordinator.get_all_stores().is_empty());
    assert!(coordinator.selected().is_none());
}

#[tokio::test]
async fn test_failed_connect_renders_latest_plan_later() {
    let (connector, mut coordinator) = setup();
    let bybit = url(Exchange::Bybit);
    connector.refuse.store(true, Ordering::SeqCst);

    coordinator
        .initialize(
            vec![Position::new("BTC", Exchange::Upbit, Exchange::Bybit)],
            Interval::OneMinute,
            None,
        )
        .await;
    let store = coordinator.get_store(Exchange::Bybit).unwrap();
    assert!(!store.is_connected());

    coordinator
        .update_selected_ticker_item(
            Some(SelectedTicker::new("SOL", Exchange::Gateio, Exchange::Bybit)),
            Interval::OneMinute,
        )
        .await
        .unwrap();
    assert_eq!(connector.open_count(&bybit), 0);

    connector.refuse.store(false, Ordering::SeqCst);
    let store = coordinator.get_store(Exchange::Bybit).unwrap();
    store.connect().await.unwrap();
    assert_eq!(
        bybit_ops(&connector.frames(&bybit)),
        vec![
            "subscribe orderbook.50.BTCUSDT",
            "subscribe orderbook.50.SOLUSDT",
            "subscribe kline.1.SOLUSDT",
            "subscribe tickers.SOLUSDT",
        ]
    );
}

#[tokio::test]
async fn test_partial_tickers_reach_listeners_merged() {
    let (connector, mut coordinator) = setup();
    let bybit = url(Exchange::Bybit);

    coordinator
        .initialize(
            Vec::new(),
            Interval::OneMinute,
            Some(SelectedTicker::new("BTC", Exchange::Upbit, Exchange::Bybit)),
        )
        .await;

    let seen: Arc<Mutex<Vec<MarketEvent>>> = Arc::new(Mutex::new(Vec::new()));
    {
        let seen = seen.clone();
        coordinator
            .get_store(Exchange::Bybit)
            .unwrap()
            .add_listener(move |event| seen.lock().unwrap().push(event.clone()));
    }

    connector
        .push(
            &bybit,
            r#"{"topic":"tickers.BTCUSDT","type":"snapshot","ts":1,
            "data":{"symbol":"BTCUSDT","price24hPcnt":"0.0150","fundingRate":"0.0001",
            "indexPrice":"64990","markPrice":"65000"}}"#,
        )
        .await;
    connector
        .push(
            &bybit,
            r#"{"topic":"tickers.BTCUSDT","type":"delta","ts":2,
            "data":{"symbol":"BTCUSDT","fundingRate":"0.0002"}}"#,
        )
        .await;
    connector.push(&bybit, r#"{"op":"ping","success":true}"#).await;

    wait_until(|| seen.lock().unwrap().len() == 2).await;

    let events = seen.lock().unwrap().clone();
    match &events[1] {
        MarketEvent::Ticker(t) => {
            assert_eq!(t.symbol, "BTC");
            assert_eq!(t.funding_rate, Some(0.0002));
            assert_eq!(t.mark_price, Some(65000.0));
        }
        other => panic!("Expected ticker, got {:?}", other),
    }
    let latest = coordinator
        .get_store(Exchange::Bybit)
        .unwrap()
        .latest_ticker("BTC")
        .unwrap();
    assert_eq!(latest.index_price, Some(64990.0));

    coordinator.cleanup().await;
    assert!(coordinator.get_all_stores().is_empty());
}
