//! Storage change notifications.
//!
//! [`Storage::subscribe`](crate::Storage::subscribe) hands out a [`Subscription`] that receives a
//! [`StorageEvent`] for every successful write, removal and clear, and for every engine fallback
//! substitution. Events are advisory: publishing never affects the outcome of an operation.

use crate::engine::EngineName;
use tokio::sync::broadcast;

/// Buffered events per subscriber before the slowest one starts lagging.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 128;

/// A handle for receiving storage change notifications.
pub type Subscription = broadcast::Receiver<StorageEvent>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StorageEvent {
    /// A key was written (`new_value` is `Some`) or removed (`new_value` is `None`).
    /// Values are the raw stored strings, keys are fully prefixed.
    Changed {
        engine: EngineName,
        key: String,
        old_value: Option<String>,
        new_value: Option<String>,
    },
    /// Every key starting with `prefix` was removed.
    Cleared { engine: EngineName, prefix: String },
    /// `requested` is not supported here; `fallback` serves its requests instead.
    Fallback { requested: EngineName, fallback: EngineName },
}

#[derive(Debug)]
pub(crate) struct StorageBus {
    tx: broadcast::Sender<StorageEvent>,
}

impl Default for StorageBus {
    fn default() -> Self {
        let (tx, _rx) = broadcast::channel(DEFAULT_CHANNEL_CAPACITY);
        Self { tx }
    }
}

impl StorageBus {
    pub(crate) fn subscribe(&self) -> Subscription {
        self.tx.subscribe()
    }

    pub(crate) fn has_subscribers(&self) -> bool {
        self.tx.receiver_count() > 0
    }

    pub(crate) fn publish(&self, ev: StorageEvent) {
        // send() fails only when there are 0 receivers, which is fine.
        let _ = self.tx.send(ev);
    }
}
