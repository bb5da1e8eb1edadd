//! Commit notifications.
//!
//! Every committed delta is announced to subscribers as a [`CommitEvent`]
//! carrying the new version and the ids it touched. Consumers use it to learn
//! that something changed; the data itself is read with
//! [`CacheReader::query_changes_since`](crate::CacheReader::query_changes_since).
//!
//! ```rust,ignore
//! let events = reader.subscribe();
//!
//! std::thread::spawn(move || {
//!     while let Ok(event) = events.recv() {
//!         let changes = reader.query_changes_since(&event.version);
//!         // ...
//!     }
//! });
//! ```

use crate::entity::EntityKey;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::mpsc::{self, Receiver, Sender};

/// A committed delta, as seen by subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitEvent<V> {
    /// Version the cache moved to.
    pub version: V,
    /// Ids upserted by the delta, in delta order.
    pub upserted_ids: Vec<EntityKey>,
    /// Ids deleted by the delta, in delta order.
    pub deleted_ids: Vec<EntityKey>,
}

/// Distributes commit events to subscribers.
///
/// Events arrive in commit order. A subscriber only sees commits that start
/// after it subscribed. Dropped receivers are pruned on the next emit.
pub(crate) struct ChangeFeed<V> {
    subscribers: RwLock<Vec<Sender<CommitEvent<V>>>>,
}

impl<V: Clone> ChangeFeed<V> {
    pub(crate) fn new() -> Self {
        Self {
            subscribers: RwLock::new(Vec::new()),
        }
    }

    /// Registers a new subscriber.
    pub(crate) fn subscribe(&self) -> Receiver<CommitEvent<V>> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.write().push(tx);
        rx
    }

    /// Sends `event` to every live subscriber.
    pub(crate) fn emit(&self, event: CommitEvent<V>) {
        let mut subscribers = self.subscribers.write();
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub(crate) fn has_subscribers(&self) -> bool {
        !self.subscribers.read().is_empty()
    }

    pub(crate) fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }
}
