//! Listener registry for canonical market events
//!
//! Listeners run synchronously on the connection's reader task, in
//! registration order. Dispatch iterates over a snapshot, so a listener
//! added or removed during a dispatch pass only takes effect on the next
//! event. A panicking listener is logged and skipped; the others still run.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::adapters::types::MarketEvent;

/// Callback invoked once per parsed event
pub type Listener = Arc<dyn Fn(&MarketEvent) + Send + Sync>;

/// Handle returned by `add`, used to remove the listener later
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

#[derive(Default)]
pub struct ListenerRegistry {
    next_id: AtomicU64,
    entries: Mutex<Vec<(ListenerId, Listener)>>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, Vec<(ListenerId, Listener)>> {
        // A panicking listener never runs while the lock is held
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn add(&self, listener: Listener) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.entries().push((id, listener));
        id
    }

    /// Returns false if the id was not registered
    pub fn remove(&self, id: ListenerId) -> bool {
        let mut entries = self.entries();
        let before = entries.len();
        entries.retain(|(existing, _)| *existing != id);
        entries.len() != before
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Invoke every listener registered at the start of the call
    pub fn dispatch(&self, event: &MarketEvent) {
        let snapshot: Vec<Listener> = self
            .entries()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        for listener in snapshot {
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| listener(event))) {
                let reason = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "non-string panic".to_string());
                tracing::error!(symbol = %event.symbol(), reason = %reason, "Listener panicked");
            }
        }
    }
}
