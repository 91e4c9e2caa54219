//! Shared WebSocket connection helpers
//!
//! Provides the `Connector` seam used by connection stores and its
//! production implementation over TLS. A session is exposed as a pair of
//! text channels so the store never touches tungstenite types directly.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{
    connect_async_tls_with_config, Connector as TungsteniteConnector, MaybeTlsStream,
    WebSocketStream,
};

use crate::adapters::errors::{ExchangeError, ExchangeResult};

/// Type alias for the WebSocket stream with TLS
pub type TlsWebSocketStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// Capacity of the per-session inbound/outbound text channels
pub const SESSION_CHANNEL_CAPACITY: usize = 1024;

/// Upper bound on the TCP, TLS and WebSocket handshake together
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Connect to a WebSocket endpoint with TLS (TLSv1.2 minimum)
///
/// # Arguments
/// * `url` - WebSocket URL to connect to (wss://)
///
/// # Returns
/// * `Ok(TlsWebSocketStream)` - Connected WebSocket stream
/// * `Err(ExchangeError)` - Connection or TLS error, or no handshake
///   within `CONNECT_TIMEOUT`
pub async fn connect_tls(url: &str) -> Result<TlsWebSocketStream, ExchangeError> {
    connect_tls_within(url, CONNECT_TIMEOUT).await
}

async fn connect_tls_within(
    url: &str,
    limit: Duration,
) -> Result<TlsWebSocketStream, ExchangeError> {
    let tls = native_tls::TlsConnector::builder()
        .min_protocol_version(Some(native_tls::Protocol::Tlsv12))
        .build()
        .map_err(|e| ExchangeError::ConnectionFailed(format!("TLS error: {}", e)))?;

    let handshake = connect_async_tls_with_config(
        url,
        None,
        false,
        Some(TungsteniteConnector::NativeTls(tls)),
    );
    let (ws_stream, _response) = tokio::time::timeout(limit, handshake)
        .await
        .map_err(|_| {
            ExchangeError::ConnectionFailed(format!(
                "{}: no handshake within {}s",
                url,
                limit.as_secs()
            ))
        })?
        .map_err(|e| ExchangeError::WebSocket(Box::new(e)))?;

    Ok(ws_stream)
}

/// An open socket, seen as text channels.
///
/// The session ends when `inbound` yields `None`. Dropping `outbound` asks
/// the transport to close the socket.
pub struct WsSession {
    pub outbound: mpsc::Sender<String>,
    pub inbound: mpsc::Receiver<String>,
    reader: Option<JoinHandle<()>>,
    writer: Option<JoinHandle<()>>,
}

impl WsSession {
    pub fn new(outbound: mpsc::Sender<String>, inbound: mpsc::Receiver<String>) -> Self {
        Self {
            outbound,
            inbound,
            reader: None,
            writer: None,
        }
    }

    fn with_tasks(mut self, reader: JoinHandle<()>, writer: JoinHandle<()>) -> Self {
        self.reader = Some(reader);
        self.writer = Some(writer);
        self
    }

    /// Split into channels and the transport task handles
    pub fn into_parts(self) -> (mpsc::Sender<String>, mpsc::Receiver<String>, SessionTasks) {
        (
            self.outbound,
            self.inbound,
            SessionTasks {
                reader: self.reader,
                writer: self.writer,
            },
        )
    }
}

/// Transport tasks behind a session
#[derive(Default)]
pub struct SessionTasks {
    reader: Option<JoinHandle<()>>,
    writer: Option<JoinHandle<()>>,
}

impl SessionTasks {
    /// Stop reading immediately. The writer drains and closes the socket
    /// once every outbound sender is dropped.
    pub fn shutdown(&mut self) {
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
        self.writer.take();
    }
}

/// Opens sockets for connection stores
#[async_trait]
pub trait Connector: Send + Sync {
    async fn open(&self, url: &str) -> ExchangeResult<WsSession>;
}

/// Production connector: tokio-tungstenite over native-tls
#[derive(Debug, Clone, Copy, Default)]
pub struct TlsConnector;

#[async_trait]
impl Connector for TlsConnector {
    async fn open(&self, url: &str) -> ExchangeResult<WsSession> {
        tracing::info!(url = %url, "Connecting WebSocket");
        let ws_stream = connect_tls(url).await?;
        let (mut sink, mut stream) = ws_stream.split();

        let (out_tx, mut out_rx) = mpsc::channel::<String>(SESSION_CHANNEL_CAPACITY);
        let (in_tx, in_rx) = mpsc::channel::<String>(SESSION_CHANNEL_CAPACITY);

        let writer_url = url.to_string();
        let writer = tokio::spawn(async move {
            while let Some(text) = out_rx.recv().await {
                if let Err(e) = sink.send(Message::Text(text)).await {
                    tracing::warn!(url = %writer_url, error = %e, "WebSocket send failed");
                    break;
                }
            }
            let _ = sink.close().await;
            tracing::debug!(url = %writer_url, "WebSocket writer closed");
        });

        let reader_url = url.to_string();
        let reader = tokio::spawn(async move {
            while let Some(msg_result) = stream.next().await {
                let text = match msg_result {
                    Ok(Message::Text(text)) => text,
                    // Upbit and Bithumb deliver JSON in binary frames
                    Ok(Message::Binary(data)) => match String::from_utf8(data) {
                        Ok(text) => text,
                        Err(_) => {
                            tracing::trace!(url = %reader_url, "Dropping non-UTF-8 binary frame");
                            continue;
                        }
                    },
                    Ok(Message::Close(frame)) => {
                        tracing::info!(url = %reader_url, frame = ?frame, "WebSocket closed by server");
                        break;
                    }
                    Ok(Message::Ping(_)) | Ok(Message::Pong(_)) | Ok(Message::Frame(_)) => continue,
                    Err(e) => {
                        tracing::error!(url = %reader_url, error = %e, "WebSocket error");
                        break;
                    }
                };

                if in_tx.send(text).await.is_err() {
                    break;
                }
            }
            tracing::debug!(url = %reader_url, "WebSocket reader ended");
        });

        Ok(WsSession::new(out_tx, in_rx).with_tasks(reader, writer))
    }
}
