//! Shared helpers for exchange adapters
//!
//! WebSocket transport, reconnection policy, and the KRW ticket protocol
//! common to Upbit and Bithumb.

pub mod krw;
pub mod reconnect;
pub mod websocket;

pub use reconnect::{reconnect_with_backoff, ReconnectConfig, ReconnectPolicy};
pub use websocket::{
    connect_tls, Connector, SessionTasks, TlsConnector, WsSession, CONNECT_TIMEOUT,
};
