//! Protocol adapter trait definition
//!
//! The ProtocolAdapter trait is the seam between the generic connection
//! machinery and one exchange's wire format: it serializes subscription
//! intents and deserializes inbound frames into canonical events.

use crate::adapters::errors::{ExchangeError, ExchangeResult};
use crate::adapters::types::{
    Channel, Exchange, Interval, MarketEvent, RequestParams, SubscriptionPlan,
    SubscriptionRequest,
};

/// Common trait for all exchange protocol adapters
///
/// Adapters are stateless with respect to the socket: they never send
/// anything themselves. The connection store owns the socket and asks the
/// adapter to render (`request_message`, `plan_messages`) or interpret
/// (`parse_message`) frames.
///
/// # Example Implementation
///
/// ```ignore
/// struct MyAdapter;
///
/// impl ProtocolAdapter for MyAdapter {
///     fn exchange(&self) -> Exchange { Exchange::Bybit }
///     fn ws_url(&self) -> &str { "wss://example" }
///     fn supports(&self, _channel: Channel) -> bool { true }
///     fn supports_unsubscribe(&self) -> bool { true }
///     fn request_message(&self, request: &SubscriptionRequest) -> ExchangeResult<String> {
///         // build {"op": "subscribe", "args": [...]}
///     }
///     fn parse_message(&self, raw: &str) -> Option<MarketEvent> { None }
/// }
/// ```
pub trait ProtocolAdapter: Send + Sync {
    /// Exchange served by this adapter
    fn exchange(&self) -> Exchange;

    /// WebSocket endpoint
    fn ws_url(&self) -> &str;

    /// Whether the exchange offers this channel at all
    fn supports(&self, channel: Channel) -> bool;

    /// Whether a single channel can be cancelled. Venues without it only
    /// accept full-overwrite subscriptions.
    fn supports_unsubscribe(&self) -> bool;

    /// Whether the default subscription set on connect includes the ticker
    fn ticker_by_default(&self) -> bool {
        self.supports(Channel::Ticker)
    }

    /// Build the wire message for one subscription intent.
    ///
    /// Fails when a required parameter is missing or the channel/operation
    /// is not offered. Those are caller bugs and must not be retried.
    fn request_message(&self, request: &SubscriptionRequest) -> ExchangeResult<String>;

    /// Best-effort parse of one inbound frame.
    ///
    /// Returns `None` for acks, heartbeats, unknown topics and malformed
    /// payloads. Never panics.
    fn parse_message(&self, raw: &str) -> Option<MarketEvent>;

    /// Application-level keepalive frame, if the venue expects one
    fn heartbeat_message(&self) -> Option<String> {
        None
    }

    /// Render the full subscription set of a connection.
    ///
    /// The default is incremental: one order-book subscribe per symbol, then
    /// candle and (optionally) ticker for the focus symbol. Overwrite-style
    /// venues override this to emit a single combined message.
    fn plan_messages(&self, plan: &SubscriptionPlan) -> ExchangeResult<Vec<String>> {
        let mut messages = Vec::new();

        if self.supports(Channel::Orderbook) {
            for symbol in plan.orderbook_symbols() {
                messages.push(self.request_message(&SubscriptionRequest::subscribe(
                    Channel::Orderbook,
                    RequestParams::for_symbol(symbol),
                ))?);
            }
        }

        if let Some(focus) = &plan.focus {
            if self.supports(Channel::Kline) {
                messages.push(self.request_message(&SubscriptionRequest::subscribe(
                    Channel::Kline,
                    RequestParams::for_symbol(focus.clone()).with_interval(plan.interval),
                ))?);
            }
            if self.ticker_by_default() {
                messages.push(self.request_message(&SubscriptionRequest::subscribe(
                    Channel::Ticker,
                    RequestParams::for_symbol(focus.clone()),
                ))?);
            }
        }

        Ok(messages)
    }
}

/// Required `symbol` parameter, or a descriptive error
pub(crate) fn required_symbol<'a>(
    exchange: Exchange,
    channel: Channel,
    params: &'a RequestParams,
) -> ExchangeResult<&'a str> {
    params
        .symbol
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .ok_or(ExchangeError::MissingParameter {
            exchange: exchange.as_str(),
            channel: channel.as_str(),
            param: "symbol",
        })
}

/// Required `interval` parameter for candle requests
pub(crate) fn required_interval(
    exchange: Exchange,
    channel: Channel,
    params: &RequestParams,
) -> ExchangeResult<Interval> {
    params.interval.ok_or(ExchangeError::MissingParameter {
        exchange: exchange.as_str(),
        channel: channel.as_str(),
        param: "interval",
    })
}

/// Every requested symbol; at least one is required
pub(crate) fn required_symbols<'a>(
    exchange: Exchange,
    channel: Channel,
    params: &'a RequestParams,
) -> ExchangeResult<Vec<&'a str>> {
    let symbols: Vec<&str> = params
        .all_symbols()
        .into_iter()
        .filter(|s| !s.trim().is_empty())
        .collect();
    if symbols.is_empty() {
        return Err(ExchangeError::MissingParameter {
            exchange: exchange.as_str(),
            channel: channel.as_str(),
            param: "symbol",
        });
    }
    Ok(symbols)
}
