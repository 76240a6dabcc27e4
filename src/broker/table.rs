//! Subscription table
//!
//! Two indices over the same set of subscriptions: topic -> connections (used
//! by broadcasts) and connection -> topics (used on disconnect). Both live
//! behind a single `RwLock` and are only ever changed together, so a reader
//! never sees one without the other. Empty entries are pruned.
//!
//! Nothing here performs I/O. Broadcasts work on [`SubscriptionTable::subscribers_of`]
//! snapshots after the lock has been released.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::broker::topic::{ConnectionId, DeliveryState, Params, SubscribeOutcome, Topic};

/// One entry of a subscriber snapshot.
#[derive(Debug, Clone)]
pub struct Subscriber {
    pub connection: ConnectionId,
    pub params: Arc<Params>,
    pub state: Arc<Mutex<DeliveryState>>,
}

#[derive(Debug, Default)]
struct Indices {
    topics: HashMap<String, Topic>,
    connections: HashMap<ConnectionId, BTreeSet<String>>,
}

#[derive(Debug, Default)]
pub struct SubscriptionTable {
    inner: RwLock<Indices>,
}

impl SubscriptionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(
        &self,
        connection: ConnectionId,
        topic: &str,
        params: Params,
    ) -> SubscribeOutcome {
        let mut guard = self.inner.write();
        let indices = &mut *guard;

        let outcome = indices
            .topics
            .entry(topic.to_string())
            .or_insert_with(|| Topic::new(topic))
            .subscribe(connection, params);

        if outcome == SubscribeOutcome::Created {
            indices
                .connections
                .entry(connection)
                .or_default()
                .insert(topic.to_string());
        }
        outcome
    }

    pub fn unsubscribe(&self, connection: ConnectionId, topic: &str) -> bool {
        let mut guard = self.inner.write();
        let indices = &mut *guard;

        let removed = match indices.topics.get_mut(topic) {
            Some(entry) => {
                let removed = entry.unsubscribe(connection);
                if entry.is_empty() {
                    indices.topics.remove(topic);
                }
                removed
            }
            None => false,
        };

        if let Some(topics) = indices.connections.get_mut(&connection) {
            topics.remove(topic);
            if topics.is_empty() {
                indices.connections.remove(&connection);
            }
        }
        removed
    }

    /// Drop every subscription of `connection`. Returns how many there were.
    pub fn remove_connection(&self, connection: ConnectionId) -> usize {
        let mut guard = self.inner.write();
        let indices = &mut *guard;

        let Some(topics) = indices.connections.remove(&connection) else {
            return 0;
        };

        for name in &topics {
            if let Some(entry) = indices.topics.get_mut(name) {
                entry.unsubscribe(connection);
                if entry.is_empty() {
                    indices.topics.remove(name);
                }
            }
        }
        topics.len()
    }

    /// Point-in-time copy of `topic`'s subscribers, in ascending connection order.
    pub fn subscribers_of(&self, topic: &str) -> Vec<Subscriber> {
        let indices = self.inner.read();
        indices
            .topics
            .get(topic)
            .map(|entry| {
                entry
                    .subscribers
                    .iter()
                    .map(|(connection, sub)| Subscriber {
                        connection: *connection,
                        params: Arc::clone(&sub.params),
                        state: Arc::clone(&sub.state),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.inner
            .read()
            .topics
            .get(topic)
            .map_or(0, |entry| entry.subscribers.len())
    }

    pub fn topics_of(&self, connection: ConnectionId) -> Vec<String> {
        self.inner
            .read()
            .connections
            .get(&connection)
            .map(|topics| topics.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn is_subscribed(&self, connection: ConnectionId, topic: &str) -> bool {
        self.inner
            .read()
            .connections
            .get(&connection)
            .is_some_and(|topics| topics.contains(topic))
    }

    pub fn params_of(&self, connection: ConnectionId, topic: &str) -> Option<Params> {
        self.inner
            .read()
            .topics
            .get(topic)
            .and_then(|entry| entry.subscribers.get(&connection))
            .map(|sub| (*sub.params).clone())
    }

    pub fn topic_count(&self) -> usize {
        self.inner.read().topics.len()
    }

    pub fn connection_count(&self) -> usize {
        self.inner.read().connections.len()
    }

    pub fn clear(&self) {
        let mut indices = self.inner.write();
        indices.topics.clear();
        indices.connections.clear();
    }

    /// Every (connection, topic) pair seen from each index, for consistency checks.
    #[cfg(test)]
    pub(crate) fn pairs(&self) -> (BTreeSet<(ConnectionId, String)>, BTreeSet<(ConnectionId, String)>) {
        let indices = self.inner.read();
        let by_topic = indices
            .topics
            .iter()
            .flat_map(|(name, entry)| {
                entry
                    .subscribers
                    .keys()
                    .map(move |connection| (*connection, name.clone()))
            })
            .collect();
        let by_connection = indices
            .connections
            .iter()
            .flat_map(|(connection, topics)| {
                topics.iter().map(move |name| (*connection, name.clone()))
            })
            .collect();
        (by_topic, by_connection)
    }
}
