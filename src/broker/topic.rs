//! Topic management
//!
//! A `Topic` holds the subscriptions for one topic name, keyed by connection.
//! A connection has at most one subscription per topic; subscribing again
//! replaces the parameters instead of adding a second entry.
//!
//! Concurrency note: callers must synchronize access to `Topic` (the
//! subscription table keeps every `Topic` behind its lock).

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::{Map, Value};

/// Transport-owned handle of one live client link.
pub type ConnectionId = u64;

/// Subscriber parameters. Opaque to the broker, read by topic filters.
pub type Params = Map<String, Value>;

/// What the broadcast engine remembers about deliveries to one subscription.
#[derive(Debug, Default)]
pub struct DeliveryState {
    pub last_delivered: Option<Value>,
}

#[derive(Debug, Clone, Default)]
pub struct Subscription {
    pub params: Arc<Params>,
    pub state: Arc<Mutex<DeliveryState>>,
}

impl Subscription {
    pub fn new(params: Params) -> Self {
        Self {
            params: Arc::new(params),
            state: Arc::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscribeOutcome {
    /// New subscription.
    Created,
    /// Existing subscription, parameters replaced.
    Updated,
    /// Existing subscription with identical parameters.
    Unchanged,
}

#[derive(Debug, Default)]
pub struct Topic {
    pub name: String,
    pub subscribers: BTreeMap<ConnectionId, Subscription>,
}

impl Topic {
    /// Create a new topic with the given name.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            subscribers: BTreeMap::new(),
        }
    }

    /// Add or update `id`'s subscription. Changed parameters also reset the
    /// delivery state, so filters start from a clean baseline.
    pub fn subscribe(&mut self, id: ConnectionId, params: Params) -> SubscribeOutcome {
        match self.subscribers.get_mut(&id) {
            Some(existing) if *existing.params == params => SubscribeOutcome::Unchanged,
            Some(existing) => {
                *existing = Subscription::new(params);
                SubscribeOutcome::Updated
            }
            None => {
                self.subscribers.insert(id, Subscription::new(params));
                SubscribeOutcome::Created
            }
        }
    }

    /// Remove `id`'s subscription. Returns whether there was one.
    pub fn unsubscribe(&mut self, id: ConnectionId) -> bool {
        self.subscribers.remove(&id).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }
}
