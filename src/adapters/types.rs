//! Core data types for exchange adapters
//!
//! Exchange identity, subscription intents, and the canonical market events
//! every adapter must produce regardless of the wire format it speaks.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::adapters::errors::ExchangeError;

// =============================================================================
// Shared Subscription ID Counter
// =============================================================================

/// Global atomic counter for unique subscription IDs across all adapters
static GLOBAL_SUBSCRIPTION_ID: AtomicU64 = AtomicU64::new(1);

/// Get next unique subscription ID (shared across all adapters)
pub fn next_subscription_id() -> u64 {
    GLOBAL_SUBSCRIPTION_ID.fetch_add(1, Ordering::SeqCst)
}

/// Current Unix time in milliseconds
pub fn current_time_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Maximum number of orderbook levels (bids/asks) to retain after parsing
pub const MAX_ORDERBOOK_DEPTH: usize = 30;

// =============================================================================
// Exchange
// =============================================================================

/// Supported exchanges. The lower-case name is the canonical form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Exchange {
    Upbit,
    Bithumb,
    Bybit,
    Gateio,
    Binance,
}

impl Exchange {
    pub const ALL: [Exchange; 5] = [
        Exchange::Upbit,
        Exchange::Bithumb,
        Exchange::Bybit,
        Exchange::Gateio,
        Exchange::Binance,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Exchange::Upbit => "upbit",
            Exchange::Bithumb => "bithumb",
            Exchange::Bybit => "bybit",
            Exchange::Gateio => "gateio",
            Exchange::Binance => "binance",
        }
    }

    /// Comma-separated list of every supported name, for error messages
    pub fn supported_names() -> String {
        Self::ALL
            .iter()
            .map(|e| e.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for Exchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Exchange {
    type Err = ExchangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "upbit" => Ok(Exchange::Upbit),
            "bithumb" => Ok(Exchange::Bithumb),
            "bybit" => Ok(Exchange::Bybit),
            "gateio" | "gate" | "gate.io" => Ok(Exchange::Gateio),
            "binance" => Ok(Exchange::Binance),
            _ => Err(ExchangeError::UnknownExchange {
                name: s.to_string(),
                supported: Self::supported_names(),
            }),
        }
    }
}

impl Serialize for Exchange {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Exchange {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// Interval
// =============================================================================

/// Candle interval preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Interval {
    #[default]
    #[serde(rename = "1m")]
    OneMinute,
    #[serde(rename = "5m")]
    FiveMinutes,
    #[serde(rename = "15m")]
    FifteenMinutes,
    #[serde(rename = "30m")]
    ThirtyMinutes,
    #[serde(rename = "1h")]
    OneHour,
    #[serde(rename = "4h")]
    FourHours,
    #[serde(rename = "1d")]
    OneDay,
}

impl Interval {
    pub const ALL: [Interval; 7] = [
        Interval::OneMinute,
        Interval::FiveMinutes,
        Interval::FifteenMinutes,
        Interval::ThirtyMinutes,
        Interval::OneHour,
        Interval::FourHours,
        Interval::OneDay,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Interval::OneMinute => "1m",
            Interval::FiveMinutes => "5m",
            Interval::FifteenMinutes => "15m",
            Interval::ThirtyMinutes => "30m",
            Interval::OneHour => "1h",
            Interval::FourHours => "4h",
            Interval::OneDay => "1d",
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Interval {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|i| i.as_str() == s.trim())
            .ok_or_else(|| format!("invalid interval '{}'", s))
    }
}

// =============================================================================
// Subscription intents
// =============================================================================

/// Market data channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Ticker,
    Kline,
    Orderbook,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Ticker => "ticker",
            Channel::Kline => "kline",
            Channel::Orderbook => "orderbook",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Subscribe or unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionOp {
    Subscribe,
    Unsubscribe,
}

impl SubscriptionOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionOp::Subscribe => "subscribe",
            SubscriptionOp::Unsubscribe => "unsubscribe",
        }
    }
}

/// Parameters of a subscription request. Symbols are base assets ("BTC");
/// adapters translate them into exchange-native codes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestParams {
    pub symbol: Option<String>,
    /// Additional symbols for venues that accept several codes per message
    #[serde(default)]
    pub symbols: Vec<String>,
    pub interval: Option<Interval>,
}

impl RequestParams {
    pub fn for_symbol(symbol: impl Into<String>) -> Self {
        Self {
            symbol: Some(symbol.into()),
            ..Default::default()
        }
    }

    pub fn with_interval(mut self, interval: Interval) -> Self {
        self.interval = Some(interval);
        self
    }

    /// `symbol` followed by `symbols`, without duplicates, in request order
    pub fn all_symbols(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::with_capacity(1 + self.symbols.len());
        for s in self.symbol.iter().chain(self.symbols.iter()) {
            if !out.contains(&s.as_str()) {
                out.push(s.as_str());
            }
        }
        out
    }
}

/// A pending or immediate wire operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionRequest {
    pub op: SubscriptionOp,
    pub channel: Channel,
    pub params: RequestParams,
}

impl SubscriptionRequest {
    pub fn subscribe(channel: Channel, params: RequestParams) -> Self {
        Self {
            op: SubscriptionOp::Subscribe,
            channel,
            params,
        }
    }

    pub fn unsubscribe(channel: Channel, params: RequestParams) -> Self {
        Self {
            op: SubscriptionOp::Unsubscribe,
            channel,
            params,
        }
    }
}

/// Desired state of one connection: order-book for every symbol, plus
/// candle/ticker for the focus (selected) symbol when there is one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscriptionPlan {
    pub symbols: BTreeSet<String>,
    pub focus: Option<String>,
    pub interval: Interval,
}

impl SubscriptionPlan {
    pub fn new(symbols: BTreeSet<String>, focus: Option<String>, interval: Interval) -> Self {
        Self {
            symbols,
            focus,
            interval,
        }
    }

    /// Order-book symbols including the focus symbol
    pub fn orderbook_symbols(&self) -> Vec<String> {
        let mut all = self.symbols.clone();
        if let Some(focus) = &self.focus {
            all.insert(focus.clone());
        }
        all.into_iter().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty() && self.focus.is_none()
    }
}

// =============================================================================
// Canonical events
// =============================================================================

/// Ticker update. Every field is optional; absent fields never erase a
/// previously known value (see [`TickerEvent::merge_from`]).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TickerEvent {
    pub symbol: String,
    pub change_percent: Option<f64>,
    pub funding_rate: Option<f64>,
    pub index_price: Option<f64>,
    pub mark_price: Option<f64>,
}

impl TickerEvent {
    /// Last-known-value merge: fields present in `update` replace ours,
    /// absent ones keep what we had.
    pub fn merge_from(&mut self, update: &TickerEvent) {
        if !update.symbol.is_empty() {
            self.symbol.clone_from(&update.symbol);
        }
        self.change_percent = update.change_percent.or(self.change_percent);
        self.funding_rate = update.funding_rate.or(self.funding_rate);
        self.index_price = update.index_price.or(self.index_price);
        self.mark_price = update.mark_price.or(self.mark_price);
    }

    pub fn is_empty(&self) -> bool {
        self.change_percent.is_none()
            && self.funding_rate.is_none()
            && self.index_price.is_none()
            && self.mark_price.is_none()
    }
}

/// OHLCV candle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandleEvent {
    pub symbol: String,
    pub time_ms: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// A single level in the orderbook
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBookLevel {
    pub price: f64,
    pub amount: f64,
    /// `price * amount`
    pub total: f64,
}

impl OrderBookLevel {
    pub fn new(price: f64, amount: f64) -> Self {
        Self {
            price,
            amount,
            total: price * amount,
        }
    }
}

/// Orderbook snapshot or delta as delivered by the exchange
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderBookEvent {
    pub symbol: String,
    pub bids: Vec<OrderBookLevel>,
    pub asks: Vec<OrderBookLevel>,
    pub timestamp_ms: u64,
}

impl OrderBookEvent {
    pub fn best_bid(&self) -> Option<f64> {
        self.bids.first().map(|l| l.price)
    }

    pub fn best_ask(&self) -> Option<f64> {
        self.asks.first().map(|l| l.price)
    }
}

/// Canonical event, tagged by channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "channel", rename_all = "lowercase")]
pub enum MarketEvent {
    Ticker(TickerEvent),
    Kline(CandleEvent),
    Orderbook(OrderBookEvent),
}

impl MarketEvent {
    pub fn channel(&self) -> Channel {
        match self {
            MarketEvent::Ticker(_) => Channel::Ticker,
            MarketEvent::Kline(_) => Channel::Kline,
            MarketEvent::Orderbook(_) => Channel::Orderbook,
        }
    }

    pub fn symbol(&self) -> &str {
        match self {
            MarketEvent::Ticker(t) => &t.symbol,
            MarketEvent::Kline(c) => &c.symbol,
            MarketEvent::Orderbook(o) => &o.symbol,
        }
    }
}

// =============================================================================
// Connection Health Types
// =============================================================================

/// Connection lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

/// Flags published to the rendering layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConnectionStatus {
    pub state: ConnectionState,
    /// True while a delayed reconnect is pending
    pub reconnecting: bool,
}

impl ConnectionStatus {
    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }
}

// =============================================================================
// Parsing helpers
// =============================================================================

/// Read a number that exchanges may send either as JSON number or string
pub(crate) fn json_f64(value: Option<&serde_json::Value>) -> Option<f64> {
    let parsed = match value? {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

/// Build levels from `(price, amount)` pairs, dropping unparseable entries
pub(crate) fn collect_levels<I>(pairs: I) -> Vec<OrderBookLevel>
where
    I: IntoIterator<Item = (Option<f64>, Option<f64>)>,
{
    pairs
        .into_iter()
        .filter_map(|(price, amount)| Some(OrderBookLevel::new(price?, amount?)))
        .take(MAX_ORDERBOOK_DEPTH)
        .collect()
}

// =============================================================================
// Tests
// =============================================================================
