//! Shared topic store with last-write-wins semantics.
//!
//! The store maps topic names to their latest typed value. `pull`
//! returns the current value (no history); `publish` atomically replaces
//! it and notifies subscribers over a broadcast channel. Multiple
//! sessions and modules may read and write any topic concurrently; there
//! is no cross-topic consistency beyond the atomic per-topic replace.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use tokio::sync::broadcast;

use crate::models::record::{TopicDataRecord, TopicValue};

/// Capacity of the publish-notification channel; slow subscribers drop
/// the oldest notifications (latest state wins).
const NOTIFY_CAPACITY: usize = 256;

/// Shared mapping from topic name to latest value.
pub struct TopicStore {
    entries: RwLock<HashMap<String, TopicValue>>,
    notify_tx: broadcast::Sender<TopicDataRecord>,
}

impl Default for TopicStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TopicStore {
    /// Construct an empty store.
    #[must_use]
    pub fn new() -> Self {
        let (notify_tx, _rx) = broadcast::channel(NOTIFY_CAPACITY);
        Self {
            entries: RwLock::new(HashMap::new()),
            notify_tx,
        }
    }

    /// Current value of a topic, or `None` if it was never published.
    #[must_use]
    pub fn pull(&self, topic: &str) -> Option<TopicDataRecord> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(topic)
            .map(|value| TopicDataRecord::new(topic, value.clone()))
    }

    /// Replace a topic's value and notify subscribers.
    pub fn publish(&self, record: TopicDataRecord) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(record.topic.clone(), record.value.clone());
        // No subscribers is not an error.
        let _ = self.notify_tx.send(record);
    }

    /// Subscribe to publish notifications.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<TopicDataRecord> {
        self.notify_tx.subscribe()
    }

    /// Names of all topics published so far, sorted.
    #[must_use]
    pub fn topics(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    /// Number of topics published so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether no topic has been published yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
