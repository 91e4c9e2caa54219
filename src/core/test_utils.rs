//! In-memory connector for store tests

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::{mpsc, Notify};

use crate::adapters::errors::{ExchangeError, ExchangeResult};
use crate::adapters::shared::{Connector, WsSession};

struct MockSession {
    url: String,
    outbound: Option<mpsc::Receiver<String>>,
    inbound: Option<mpsc::Sender<String>>,
}

/// Records every outbound frame and lets tests inject inbound frames
#[derive(Default)]
pub struct MockConnector {
    sessions: Mutex<Vec<MockSession>>,
    refuse: AtomicBool,
    stall: AtomicBool,
    release: Notify,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent `open` calls fail
    pub fn set_refuse(&self, refuse: bool) {
        self.refuse.store(refuse, Ordering::SeqCst);
    }

    /// Make subsequent `open` calls hang until `release_one`
    pub fn set_stall(&self, stall: bool) {
        self.stall.store(stall, Ordering::SeqCst);
    }

    /// Let one stalled `open` finish
    pub fn release_one(&self) {
        self.release.notify_one();
    }

    pub fn open_count(&self) -> usize {
        self.sessions.lock().unwrap().len()
    }

    /// Drain frames sent on every session for `url` since the last call
    pub fn frames(&self, url: &str) -> Vec<String> {
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

    /// Deliver a frame on the latest session for `url`; ignored if closed
    pub async fn push(&self, url: &str, raw: &str) {
        let sender = self
            .sessions
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|s| s.url == url)
            .and_then(|s| s.inbound.clone());
        if let Some(sender) = sender {
            let _ = sender.send(raw.to_string()).await;
        }
    }

    /// Make the latest session for `url` refuse outbound frames
    pub fn drop_writer(&self, url: &str) {
        let mut sessions = self.sessions.lock().unwrap();
        if let Some(session) = sessions.iter_mut().rev().find(|s| s.url == url) {
            session.outbound = None;
        }
    }

    /// Simulate a remote close of the latest session for `url`
    pub fn close_latest(&self, url: &str) {
        let mut sessions = self.sessions.lock().unwrap();
        if let Some(session) = sessions.iter_mut().rev().find(|s| s.url == url) {
            session.inbound = None;
        }
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn open(&self, url: &str) -> ExchangeResult<WsSession> {
        if self.refuse.load(Ordering::SeqCst) {
            return Err(ExchangeError::ConnectionFailed(format!("refused: {}", url)));
        }
        if self.stall.load(Ordering::SeqCst) {
            self.release.notified().await;
        }
        let (out_tx, out_rx) = mpsc::channel(256);
        let (in_tx, in_rx) = mpsc::channel(256);
        self.sessions.lock().unwrap().push(MockSession {
            url: url.to_string(),
            outbound: Some(out_rx),
            inbound: Some(in_tx),
        });
        Ok(WsSession::new(out_tx, in_rx))
    }
}
