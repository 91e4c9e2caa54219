//! Subscription coordinator
//!
//! Reconciles the desired subscription state (open positions plus the
//! selected instrument) against one `ConnectionStore` per exchange, sending
//! the smallest wire delta for each change:
//!
//! - overwrite-style exchanges (no unsubscribe) get their whole plan
//!   re-sent in one frame
//! - incremental exchanges get unsubscribes for what the old selection
//!   needed and subscribes for what the new one needs
//! - exchanges nobody references any more are disconnected and dropped
//!
//! Every delta is computed against the state from before the call.
//!
//! Exchanges are reconciled independently. A socket that stops taking
//! frames is reset and picks up its full plan on the next connect; only
//! requests an adapter cannot render are returned to the caller.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use crate::adapters::errors::{ExchangeError, ExchangeResult};
use crate::adapters::factory::{create_adapter, AnyAdapter};
use crate::adapters::shared::{Connector, ReconnectPolicy};
use crate::adapters::traits::ProtocolAdapter;
use crate::adapters::types::{
    Channel, Exchange, Interval, RequestParams, SubscriptionPlan, SubscriptionRequest,
};
use crate::core::store::ConnectionStore;
use crate::core::types::{normalize_symbol, Position, SelectedTicker};

/// Symbols an exchange needs for open positions alone
pub fn position_symbols(positions: &[Position], exchange: Exchange) -> BTreeSet<String> {
    positions
        .iter()
        .filter(|p| p.legs().contains(&exchange))
        .map(|p| normalize_symbol(&p.symbol))
        .filter(|s| !s.is_empty())
        .collect()
}

/// The selected symbol, if the selection has a leg on `exchange`
pub fn focus_symbol(selected: Option<&SelectedTicker>, exchange: Exchange) -> Option<String> {
    selected
        .filter(|s| s.involves(exchange))
        .map(|s| normalize_symbol(&s.symbol))
        .filter(|s| !s.is_empty())
}

/// Desired order-book symbol set of one exchange
pub fn desired_symbols(
    positions: &[Position],
    selected: Option<&SelectedTicker>,
    exchange: Exchange,
) -> BTreeSet<String> {
    let mut symbols = position_symbols(positions, exchange);
    symbols.extend(focus_symbol(selected, exchange));
    symbols
}

/// Requests moving an incremental exchange from one focus to another.
///
/// `tracked` is the order-book set before the change.
pub fn selection_delta(
    adapter: &AnyAdapter,
    positions: &BTreeSet<String>,
    tracked: &BTreeSet<String>,
    previous: (Option<&str>, Interval),
    next: (Option<&str>, Interval),
) -> Vec<SubscriptionRequest> {
    let (prev_focus, prev_interval) = previous;
    let (new_focus, interval) = next;
    let symbol_changed = prev_focus != new_focus;
    let interval_changed = prev_interval != interval;
    let mut requests = Vec::new();

    if let Some(prev) = prev_focus {
        if adapter.supports(Channel::Kline) && (symbol_changed || interval_changed) {
            requests.push(SubscriptionRequest::unsubscribe(
                Channel::Kline,
                RequestParams::for_symbol(prev).with_interval(prev_interval),
            ));
        }
        if adapter.ticker_by_default() && symbol_changed {
            requests.push(SubscriptionRequest::unsubscribe(
                Channel::Ticker,
                RequestParams::for_symbol(prev),
            ));
        }
        if adapter.supports(Channel::Orderbook) && symbol_changed && !positions.contains(prev) {
            requests.push(SubscriptionRequest::unsubscribe(
                Channel::Orderbook,
                RequestParams::for_symbol(prev),
            ));
        }
    }

    if let Some(new) = new_focus {
        if adapter.supports(Channel::Kline) && (symbol_changed || interval_changed) {
            requests.push(SubscriptionRequest::subscribe(
                Channel::Kline,
                RequestParams::for_symbol(new).with_interval(interval),
            ));
        }
        if adapter.ticker_by_default() && symbol_changed {
            requests.push(SubscriptionRequest::subscribe(
                Channel::Ticker,
                RequestParams::for_symbol(new),
            ));
        }
        if adapter.supports(Channel::Orderbook) && !tracked.contains(new) {
            requests.push(SubscriptionRequest::subscribe(
                Channel::Orderbook,
                RequestParams::for_symbol(new),
            ));
        }
    }

    requests
}

/// Owns every exchange connection of one view
pub struct Coordinator {
    stores: HashMap<Exchange, ConnectionStore>,
    exchange_symbols: HashMap<Exchange, BTreeSet<String>>,
    positions: Vec<Position>,
    selected: Option<SelectedTicker>,
    interval: Interval,
    connector: Arc<dyn Connector>,
    reconnect: ReconnectPolicy,
}

impl Coordinator {
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        Self {
            stores: HashMap::new(),
            exchange_symbols: HashMap::new(),
            positions: Vec::new(),
            selected: None,
            interval: Interval::default(),
            connector,
            reconnect: ReconnectPolicy::Disabled,
        }
    }

    /// Policy given to every store created from now on
    pub fn with_reconnect_policy(mut self, policy: ReconnectPolicy) -> Self {
        self.reconnect = policy;
        self
    }

    fn create_store(&self, exchange: Exchange, plan: SubscriptionPlan) -> ConnectionStore {
        ConnectionStore::new(
            create_adapter(exchange),
            plan,
            Arc::clone(&self.connector),
            self.reconnect.clone(),
        )
    }

    async fn connect_store(store: &ConnectionStore) {
        if let Err(e) = store.connect().await {
            tracing::warn!(
                exchange = %store.exchange(),
                error = %e,
                "Store left disconnected"
            );
        }
    }

    /// Tear everything down and build one connection per referenced exchange
    pub async fn initialize(
        &mut self,
        positions: Vec<Position>,
        interval: Interval,
        selected: Option<SelectedTicker>,
    ) {
        self.cleanup().await;

        self.positions = positions.into_iter().map(normalize_position).collect();
        self.selected = selected.map(normalize_selection);
        self.interval = interval;

        let exchanges: BTreeSet<Exchange> = self
            .positions
            .iter()
            .flat_map(|p| p.legs())
            .chain(self.selected.iter().flat_map(|s| s.legs()))
            .collect();

        for exchange in exchanges {
            let plan = SubscriptionPlan::new(
                position_symbols(&self.positions, exchange),
                focus_symbol(self.selected.as_ref(), exchange),
                interval,
            );
            if plan.is_empty() {
                continue;
            }
            self.exchange_symbols
                .insert(exchange, plan.orderbook_symbols().into_iter().collect());

            let store = self.create_store(exchange, plan);
            Self::connect_store(&store).await;
            self.stores.insert(exchange, store);
        }

        tracing::info!(
            exchanges = self.stores.len(),
            positions = self.positions.len(),
            selected = ?self.selected.as_ref().map(|s| s.symbol.as_str()),
            interval = %interval,
            "Coordinator initialized"
        );
    }

    /// Move the selection without touching exchanges it never referenced
    pub async fn update_selected_ticker_item(
        &mut self,
        selected: Option<SelectedTicker>,
        interval: Interval,
    ) -> ExchangeResult<()> {
        let selected = selected.map(normalize_selection);
        let previous = self.selected.clone();
        let prev_interval = self.interval;

        let touched: BTreeSet<Exchange> = previous
            .iter()
            .chain(selected.iter())
            .flat_map(|s| s.legs())
            .collect();
        let mut rejected = None;

        for exchange in touched {
            let positions = position_symbols(&self.positions, exchange);
            let prev_focus = focus_symbol(previous.as_ref(), exchange);
            let new_focus = focus_symbol(selected.as_ref(), exchange);
            let plan = SubscriptionPlan::new(positions.clone(), new_focus.clone(), interval);

            if plan.is_empty() {
                self.exchange_symbols.remove(&exchange);
                if let Some(store) = self.stores.remove(&exchange) {
                    store.disconnect().await;
                    tracing::info!(exchange = %exchange, "Connection released");
                }
                continue;
            }
            self.exchange_symbols
                .insert(exchange, plan.orderbook_symbols().into_iter().collect());

            let Some(store) = self.stores.get(&exchange) else {
                let store = self.create_store(exchange, plan);
                Self::connect_store(&store).await;
                self.stores.insert(exchange, store);
                continue;
            };

            if !store.adapter().supports_unsubscribe() {
                store.set_plan(plan).await;
                let result = store.resubscribe().await.map(|_| ());
                Self::settle(store, result, &mut rejected).await;
                continue;
            }

            let tracked = store.symbols().await;
            store.set_plan(plan).await;
            if !store.is_connected() {
                // Next connect renders the new plan
                continue;
            }
            let requests = selection_delta(
                store.adapter(),
                &positions,
                &tracked,
                (prev_focus.as_deref(), prev_interval),
                (new_focus.as_deref(), interval),
            );
            let result = Self::send_all(store, requests).await;
            Self::settle(store, result, &mut rejected).await;
        }

        self.selected = selected;
        self.interval = interval;
        rejected.map_or(Ok(()), Err)
    }

    async fn send_all(
        store: &ConnectionStore,
        requests: Vec<SubscriptionRequest>,
    ) -> ExchangeResult<()> {
        for request in requests {
            store.send(request).await?;
        }
        Ok(())
    }

    /// Keep the first configuration error for the caller; reset the store
    /// on transport errors so its next connect re-sends the whole plan
    async fn settle(
        store: &ConnectionStore,
        result: ExchangeResult<()>,
        rejected: &mut Option<ExchangeError>,
    ) {
        match result {
            Ok(()) => {}
            Err(e) if e.is_configuration() => {
                tracing::error!(exchange = %store.exchange(), error = %e, "Request rejected");
                rejected.get_or_insert(e);
            }
            Err(e) => {
                tracing::warn!(exchange = %store.exchange(), error = %e, "Delta not delivered");
                store.reset().await;
            }
        }
    }

    /// Re-send every connected exchange's full plan with the new interval.
    ///
    /// Incremental exchanges first drop the focus candle of the old interval,
    /// so repeated calls with the same interval send identical frames.
    pub async fn update_interval(&mut self, interval: Interval) -> ExchangeResult<()> {
        self.interval = interval;

        let ordered: BTreeMap<Exchange, &ConnectionStore> =
            self.stores.iter().map(|(e, s)| (*e, s)).collect();
        let mut rejected = None;
        for (exchange, store) in ordered {
            let mut plan = store.plan().await;
            let old_interval = plan.interval;
            plan.interval = interval;
            store.set_plan(plan.clone()).await;

            if !store.is_connected() {
                continue;
            }
            let adapter = store.adapter();
            let mut requests = Vec::new();
            if old_interval != interval
                && adapter.supports_unsubscribe()
                && adapter.supports(Channel::Kline)
            {
                if let Some(focus) = &plan.focus {
                    requests.push(SubscriptionRequest::unsubscribe(
                        Channel::Kline,
                        RequestParams::for_symbol(focus.clone()).with_interval(old_interval),
                    ));
                }
            }
            let result = match Self::send_all(store, requests).await {
                Ok(()) => store.resubscribe().await.map(|frames| {
                    tracing::debug!(exchange = %exchange, frames, interval = %interval, "Interval applied");
                }),
                Err(e) => Err(e),
            };
            Self::settle(store, result, &mut rejected).await;
        }
        rejected.map_or(Ok(()), Err)
    }

    /// Replace the position list. Nothing is re-sent until the next
    /// `initialize`, selection change or interval change.
    pub fn update_positions(&mut self, positions: Vec<Position>) {
        self.positions = positions.into_iter().map(normalize_position).collect();
    }

    pub fn get_store(&self, exchange: Exchange) -> Option<&ConnectionStore> {
        self.stores.get(&exchange)
    }

    pub fn get_all_stores(&self) -> &HashMap<Exchange, ConnectionStore> {
        &self.stores
    }

    /// Tracked symbol set of one exchange
    pub fn exchange_symbols(&self, exchange: Exchange) -> Option<&BTreeSet<String>> {
        self.exchange_symbols.get(&exchange)
    }

    pub fn selected(&self) -> Option<&SelectedTicker> {
        self.selected.as_ref()
    }

    pub fn interval(&self) -> Interval {
        self.interval
    }

    pub fn positions(&self) -> &[Position] {
        &self.positions
    }

    /// Disconnect and drop every connection
    pub async fn cleanup(&mut self) {
        for (exchange, store) in self.stores.drain() {
            store.disconnect().await;
            tracing::debug!(exchange = %exchange, "Store cleaned up");
        }
        self.exchange_symbols.clear();
    }
}

fn normalize_position(position: Position) -> Position {
    Position {
        symbol: normalize_symbol(&position.symbol),
        ..position
    }
}

fn normalize_selection(selected: SelectedTicker) -> SelectedTicker {
    SelectedTicker {
        symbol: normalize_symbol(&selected.symbol),
        ..selected
    }
}
