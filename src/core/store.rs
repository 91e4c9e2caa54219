//! Per-exchange connection store
//!
//! One `ConnectionStore` owns the socket of one exchange. It renders the
//! current `SubscriptionPlan` through the exchange's adapter on every
//! connect, buffers requests issued while disconnected, and dispatches
//! parsed events to listeners.
//!
//! # State machine
//!
//! `Disconnected → Connecting → Connected → Disconnected`. There is no
//! automatic reconnect after an unexpected close unless the store was built
//! with `ReconnectPolicy::Bounded`.
//!
//! # Ordering
//!
//! All mutations go through one async mutex, which is never held across the
//! socket handshake. Requests sent while the socket opens are buffered and
//! flushed before the plan, so intent order is preserved on the wire.

use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use futures_util::future::BoxFuture;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;

use crate::adapters::errors::{ExchangeError, ExchangeResult};
use crate::adapters::factory::AnyAdapter;
use crate::adapters::shared::{
    reconnect_with_backoff, Connector, ReconnectConfig, ReconnectPolicy, SessionTasks,
};
use crate::adapters::traits::ProtocolAdapter;
use crate::adapters::types::{
    ConnectionState, ConnectionStatus, Exchange, Interval, MarketEvent, SubscriptionPlan,
    SubscriptionRequest, TickerEvent,
};
use crate::core::listeners::{Listener, ListenerId, ListenerRegistry};
use crate::core::types::normalize_symbol;

/// Wait imposed between the disconnect and reconnect of an interval change
pub const INTERVAL_CHANGE_RECONNECT_DELAY: Duration = Duration::from_secs(10);

/// Application-level keepalive period
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(20);

// =============================================================================
// Internal state
// =============================================================================

/// A live socket and the tasks serving it
struct Session {
    outbound: mpsc::Sender<String>,
    transport: SessionTasks,
    reader: Option<JoinHandle<()>>,
    heartbeat: Option<JoinHandle<()>>,
}

impl Session {
    /// Stop all tasks; dropping `outbound` lets the writer close the socket.
    /// The reader handle is only detached when called from the reader itself.
    fn close(mut self, from_reader: bool) {
        if let Some(reader) = self.reader.take() {
            if !from_reader {
                reader.abort();
            }
        }
        if let Some(heartbeat) = self.heartbeat.take() {
            heartbeat.abort();
        }
        self.transport.shutdown();
    }
}

struct StoreState {
    session: Option<Session>,
    pending: VecDeque<SubscriptionRequest>,
    plan: SubscriptionPlan,
    /// Generation of the socket currently being opened
    connecting: Option<u64>,
    /// Delayed interval reconnect or bounded-retry task
    reconnect_task: Option<JoinHandle<()>>,
}

struct StoreShared {
    adapter: AnyAdapter,
    connector: Arc<dyn Connector>,
    reconnect: ReconnectPolicy,
    state: Mutex<StoreState>,
    status: watch::Sender<ConnectionStatus>,
    /// Bumped on every connect and teardown; frames from older sessions are dropped
    generation: AtomicU64,
    listeners: ListenerRegistry,
    tickers: StdMutex<HashMap<String, TickerEvent>>,
}

impl StoreShared {
    fn exchange(&self) -> Exchange {
        self.adapter.exchange()
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    fn set_state(&self, state: ConnectionState) {
        self.status.send_modify(|status| status.state = state);
    }

    fn set_reconnecting(&self, reconnecting: bool) {
        self.status.send_modify(|status| status.reconnecting = reconnecting);
    }

    /// Close the live session, if any, and invalidate its in-flight frames
    /// along with any connect still opening its socket
    fn teardown(&self, state: &mut StoreState) -> bool {
        self.generation.fetch_add(1, Ordering::SeqCst);
        state.connecting = None;
        match state.session.take() {
            Some(session) => {
                session.close(false);
                true
            }
            None => false,
        }
    }

    /// Merge partial tickers into the last known value for the symbol
    fn merge_ticker(&self, event: MarketEvent) -> MarketEvent {
        match event {
            MarketEvent::Ticker(update) => {
                let mut tickers = self
                    .tickers
                    .lock()
                    .unwrap_or_else(|poisoned| poisoned.into_inner());
                let known = tickers
                    .entry(update.symbol.clone())
                    .or_insert_with(|| TickerEvent {
                        symbol: update.symbol.clone(),
                        ..Default::default()
                    });
                known.merge_from(&update);
                MarketEvent::Ticker(known.clone())
            }
            other => other,
        }
    }
}

// =============================================================================
// Session tasks
// =============================================================================

/// Open a session and send buffered requests followed by the plan.
///
/// The state lock is released while the socket opens, so `disconnect` never
/// waits on a slow handshake. A teardown during the open bumps the
/// generation and the finished socket is discarded.
///
/// Boxed so the reader and retry tasks can call back into it.
fn open_session(shared: Arc<StoreShared>) -> BoxFuture<'static, ExchangeResult<()>> {
    Box::pin(async move {
        let exchange = shared.exchange();
        let attempt = {
            let mut state = shared.state.lock().await;
            if state.session.is_some() {
                return Ok(());
            }
            match state.connecting {
                Some(attempt) if shared.is_current(attempt) => None,
                _ => {
                    let attempt = shared.generation.fetch_add(1, Ordering::SeqCst) + 1;
                    state.connecting = Some(attempt);
                    shared.set_state(ConnectionState::Connecting);
                    Some(attempt)
                }
            }
        };
        let Some(generation) = attempt else {
            return wait_for_connect(&shared).await;
        };

        let opened = shared.connector.open(shared.adapter.ws_url()).await;

        let mut state = shared.state.lock().await;
        if !shared.is_current(generation) {
            if let Ok(session) = opened {
                let (_, _, mut transport) = session.into_parts();
                transport.shutdown();
            }
            tracing::debug!(exchange = %exchange, "Connect cancelled by disconnect");
            return Err(ExchangeError::ConnectionFailed(format!(
                "{}: connect cancelled",
                exchange
            )));
        }
        state.connecting = None;

        let session = match opened {
            Ok(session) => session,
            Err(e) => {
                shared.set_state(ConnectionState::Disconnected);
                tracing::warn!(exchange = %exchange, error = %e, "Connection failed");
                return Err(e);
            }
        };
        let (outbound, inbound, mut transport) = session.into_parts();

        let mut frames = Vec::with_capacity(state.pending.len() + 4);
        while let Some(request) = state.pending.pop_front() {
            match shared.adapter.request_message(&request) {
                Ok(frame) => frames.push(frame),
                Err(e) => {
                    tracing::warn!(exchange = %exchange, error = %e, "Dropping buffered request")
                }
            }
        }
        match shared.adapter.plan_messages(&state.plan) {
            Ok(plan_frames) => frames.extend(plan_frames),
            Err(e) => tracing::warn!(exchange = %exchange, error = %e, "Subscription plan rejected"),
        }

        for frame in frames {
            if outbound.send(frame).await.is_err() {
                transport.shutdown();
                shared.set_state(ConnectionState::Disconnected);
                return Err(ExchangeError::SendFailed(format!(
                    "{}: socket closed while subscribing",
                    exchange
                )));
            }
        }

        let reader = tokio::spawn(read_loop(Arc::clone(&shared), inbound, generation));
        let heartbeat = shared
            .adapter
            .heartbeat_message()
            .map(|_| tokio::spawn(heartbeat_loop(Arc::clone(&shared), outbound.clone())));

        state.session = Some(Session {
            outbound,
            transport,
            reader: Some(reader),
            heartbeat,
        });
        shared.set_state(ConnectionState::Connected);
        tracing::info!(
            exchange = %exchange,
            symbols = state.plan.orderbook_symbols().len(),
            focus = ?state.plan.focus,
            interval = %state.plan.interval,
            "Connected"
        );
        Ok(())
    })
}

/// Join a connect already in flight and report its outcome
async fn wait_for_connect(shared: &StoreShared) -> ExchangeResult<()> {
    let mut status = shared.status.subscribe();
    let settled = status
        .wait_for(|status| status.state != ConnectionState::Connecting)
        .await
        .map(|status| status.is_connected());
    match settled {
        Ok(true) => Ok(()),
        _ => Err(ExchangeError::ConnectionFailed(format!(
            "{}: concurrent connect did not complete",
            shared.exchange()
        ))),
    }
}

async fn read_loop(shared: Arc<StoreShared>, mut inbound: mpsc::Receiver<String>, generation: u64) {
    while let Some(raw) = inbound.recv().await {
        if !shared.is_current(generation) {
            return;
        }
        if let Some(event) = shared.adapter.parse_message(&raw) {
            let event = shared.merge_ticker(event);
            shared.listeners.dispatch(&event);
        }
    }
    on_session_end(&shared, generation).await;
}

/// The socket closed without a disconnect request
async fn on_session_end(shared: &Arc<StoreShared>, generation: u64) {
    let mut state = shared.state.lock().await;
    if !shared.is_current(generation) {
        return;
    }
    if let Some(session) = state.session.take() {
        session.close(true);
    }
    shared.set_state(ConnectionState::Disconnected);
    tracing::warn!(exchange = %shared.exchange(), "Connection closed by remote");
    schedule_retry(shared, &mut state);
}

/// Start a bounded retry, if the policy allows one
fn schedule_retry(shared: &Arc<StoreShared>, state: &mut StoreState) {
    if let ReconnectPolicy::Bounded(config) = &shared.reconnect {
        let task = tokio::spawn(retry_connect(Arc::clone(shared), config.clone()));
        if let Some(previous) = state.reconnect_task.replace(task) {
            previous.abort();
        }
    }
}

async fn retry_connect(shared: Arc<StoreShared>, config: ReconnectConfig) {
    let exchange = shared.exchange();
    shared.set_reconnecting(true);
    let result =
        reconnect_with_backoff(&config, exchange.as_str(), || open_session(Arc::clone(&shared)))
            .await;
    shared.set_reconnecting(false);
    if let Err(e) = result {
        tracing::error!(exchange = %exchange, error = %e, "Giving up reconnecting");
    }
}

async fn heartbeat_loop(shared: Arc<StoreShared>, outbound: mpsc::Sender<String>) {
    let mut ticker = tokio::time::interval(HEARTBEAT_INTERVAL);
    ticker.tick().await; // skip first immediate tick

    loop {
        ticker.tick().await;
        let Some(frame) = shared.adapter.heartbeat_message() else {
            break;
        };
        if outbound.send(frame).await.is_err() {
            break;
        }
        tracing::trace!(exchange = %shared.exchange(), "Heartbeat sent");
    }
}

// =============================================================================
// ConnectionStore
// =============================================================================

/// Connection owner for one exchange
pub struct ConnectionStore {
    shared: Arc<StoreShared>,
}

impl ConnectionStore {
    /// Create a disconnected store. Nothing is opened until `connect`.
    pub fn new(
        adapter: AnyAdapter,
        plan: SubscriptionPlan,
        connector: Arc<dyn Connector>,
        reconnect: ReconnectPolicy,
    ) -> Self {
        let (status, _) = watch::channel(ConnectionStatus::default());
        Self {
            shared: Arc::new(StoreShared {
                adapter,
                connector,
                reconnect,
                state: Mutex::new(StoreState {
                    session: None,
                    pending: VecDeque::new(),
                    plan,
                    connecting: None,
                    reconnect_task: None,
                }),
                status,
                generation: AtomicU64::new(0),
                listeners: ListenerRegistry::new(),
                tickers: StdMutex::new(HashMap::new()),
            }),
        }
    }

    pub fn exchange(&self) -> Exchange {
        self.shared.exchange()
    }

    pub fn adapter(&self) -> &AnyAdapter {
        &self.shared.adapter
    }

    /// Open the socket, flush buffered requests, then subscribe the plan.
    /// No-op when already connected.
    pub async fn connect(&self) -> ExchangeResult<()> {
        open_session(Arc::clone(&self.shared)).await
    }

    /// Send one request now, or buffer it until the next connect.
    ///
    /// Requests the adapter cannot render fail here, connected or not.
    pub async fn send(&self, request: SubscriptionRequest) -> ExchangeResult<()> {
        let frame = self.shared.adapter.request_message(&request)?;
        let mut state = self.shared.state.lock().await;

        if let Some(session) = &state.session {
            if session.outbound.send(frame).await.is_ok() {
                tracing::debug!(
                    exchange = %self.exchange(),
                    op = request.op.as_str(),
                    channel = %request.channel,
                    "Request sent"
                );
                return Ok(());
            }
            tracing::debug!(exchange = %self.exchange(), "Socket closing, buffering request");
        }

        state.pending.push_back(request);
        Ok(())
    }

    /// Close the socket and cancel any scheduled reconnect. Idempotent.
    pub async fn disconnect(&self) {
        let mut state = self.shared.state.lock().await;
        if let Some(task) = state.reconnect_task.take() {
            task.abort();
        }
        if self.shared.teardown(&mut state) {
            tracing::info!(exchange = %self.exchange(), "Disconnected");
        }
        self.shared.status.send_modify(|status| {
            status.state = ConnectionState::Disconnected;
            status.reconnecting = false;
        });
    }

    /// Drop a session whose socket stopped taking frames. Buffered requests
    /// survive, and the next connect renders the full current plan.
    pub async fn reset(&self) {
        let mut state = self.shared.state.lock().await;
        if self.shared.teardown(&mut state) {
            self.shared.set_state(ConnectionState::Disconnected);
            tracing::warn!(exchange = %self.exchange(), "Session dropped after send failure");
            schedule_retry(&self.shared, &mut state);
        }
    }

    /// Switch the focus symbol with a fresh session
    pub async fn set_symbol(&self, symbol: &str) -> ExchangeResult<()> {
        {
            let mut state = self.shared.state.lock().await;
            state.plan.focus = Some(normalize_symbol(symbol));
        }
        self.disconnect().await;
        self.connect().await
    }

    /// Change the candle interval: disconnect now, reconnect after
    /// `INTERVAL_CHANGE_RECONNECT_DELAY`. `is_reconnecting()` is true for the
    /// whole wait; requests sent meanwhile are buffered.
    pub async fn set_interval(&self, interval: Interval) {
        let mut state = self.shared.state.lock().await;
        if let Some(task) = state.reconnect_task.take() {
            task.abort();
        }
        state.plan.interval = interval;
        self.shared.teardown(&mut state);
        self.shared.status.send_modify(|status| {
            status.state = ConnectionState::Disconnected;
            status.reconnecting = true;
        });
        tracing::info!(
            exchange = %self.exchange(),
            interval = %interval,
            delay_secs = INTERVAL_CHANGE_RECONNECT_DELAY.as_secs(),
            "Interval changed, reconnect scheduled"
        );

        let shared = Arc::clone(&self.shared);
        state.reconnect_task = Some(tokio::spawn(async move {
            tokio::time::sleep(INTERVAL_CHANGE_RECONNECT_DELAY).await;
            if let Err(e) = open_session(Arc::clone(&shared)).await {
                tracing::warn!(exchange = %shared.exchange(), error = %e, "Delayed reconnect failed");
            }
            shared.set_reconnecting(false);
        }));
    }

    /// Re-send the whole plan on the live socket. No-op when disconnected,
    /// since the next connect sends it anyway.
    pub async fn resubscribe(&self) -> ExchangeResult<usize> {
        let state = self.shared.state.lock().await;
        let Some(session) = &state.session else {
            return Ok(0);
        };

        let frames = self.shared.adapter.plan_messages(&state.plan)?;
        let count = frames.len();
        for frame in frames {
            session.outbound.send(frame).await.map_err(|_| {
                ExchangeError::SendFailed(format!("{}: socket closed", self.exchange()))
            })?;
        }
        tracing::debug!(exchange = %self.exchange(), frames = count, "Resubscribed");
        Ok(count)
    }

    /// Replace the tracked plan without sending anything
    pub async fn set_plan(&self, plan: SubscriptionPlan) {
        self.shared.state.lock().await.plan = plan;
    }

    pub async fn plan(&self) -> SubscriptionPlan {
        self.shared.state.lock().await.plan.clone()
    }

    /// Order-book symbols currently tracked (positions plus focus)
    pub async fn symbols(&self) -> BTreeSet<String> {
        self.plan().await.orderbook_symbols().into_iter().collect()
    }

    pub async fn focus(&self) -> Option<String> {
        self.shared.state.lock().await.plan.focus.clone()
    }

    pub async fn interval(&self) -> Interval {
        self.shared.state.lock().await.plan.interval
    }

    /// Requests waiting for the next connect
    pub async fn pending_len(&self) -> usize {
        self.shared.state.lock().await.pending.len()
    }

    pub fn add_listener<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&MarketEvent) + Send + Sync + 'static,
    {
        let listener: Listener = Arc::new(listener);
        self.shared.listeners.add(listener)
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.shared.listeners.remove(id)
    }

    pub fn listener_count(&self) -> usize {
        self.shared.listeners.len()
    }

    pub fn status(&self) -> ConnectionStatus {
        *self.shared.status.borrow()
    }

    /// Receiver notified on every status change
    pub fn watch_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.shared.status.subscribe()
    }

    pub fn is_connected(&self) -> bool {
        self.status().is_connected()
    }

    pub fn is_reconnecting(&self) -> bool {
        self.status().reconnecting
    }

    /// Last known ticker for a symbol, merged across partial updates
    pub fn latest_ticker(&self, symbol: &str) -> Option<TickerEvent> {
        self.shared
            .tickers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(symbol)
            .cloned()
    }
}

// =============================================================================
// Tests
// =============================================================================
