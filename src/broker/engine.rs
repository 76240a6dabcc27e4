//! Broker engine
//!
//! The `Broker` is the context object shared by the transport (through the
//! lifecycle hooks) and by application publishers. It owns:
//! - the topic registry, resolved once at startup
//! - the subscription table
//! - a handle to the transport's send primitive
//!
//! Concurrency and usage notes:
//! - Every method takes `&self`; share the broker as `Arc<Broker>`. Locking
//!   is internal to the subscription table and limited to index mutation.
//! - `publish` works on a snapshot of the subscriber set, so filters,
//!   serialization and sends happen with the table unlocked.
//! - A subscriber's delivery state is locked only to run the filter and to
//!   record the delivered payload, never across a send.
//! - A failed send is logged and counted. The subscription stays until the
//!   transport reports the disconnect.

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::broker::message::Envelope;
use crate::broker::table::{Subscriber, SubscriptionTable};
use crate::broker::topic::{ConnectionId, Params, SubscribeOutcome};
use crate::registry::TopicRegistry;
use crate::transport::Transport;
use crate::utils::{PubSubError, Result};

/// Per-connection view of the subscription state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No subscriptions recorded.
    Unknown,
    /// At least one subscription.
    Active,
}

/// Outcome of one broadcast.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishReport {
    pub delivered: usize,
    /// Skipped by the topic's filter.
    pub suppressed: usize,
    pub failed: usize,
}

pub struct Broker {
    registry: Arc<TopicRegistry>,
    table: SubscriptionTable,
    transport: Arc<dyn Transport>,
}

impl fmt::Debug for Broker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Broker")
            .field("registry", &self.registry)
            .field("table", &self.table)
            .finish_non_exhaustive()
    }
}

impl Broker {
    pub fn new(registry: TopicRegistry, transport: Arc<dyn Transport>) -> Self {
        Self {
            registry: Arc::new(registry),
            table: SubscriptionTable::new(),
            transport,
        }
    }

    pub fn registry(&self) -> &TopicRegistry {
        &self.registry
    }

    /// Subscribe `connection` to `topic`, or replace its parameters.
    ///
    /// Fails with `InvalidTopic` when the registry rejects the name and with
    /// `MalformedRequest` when `params` do not fit the topic's schema. The
    /// table is left untouched on failure.
    pub fn subscribe(
        &self,
        connection: ConnectionId,
        topic: &str,
        params: Params,
    ) -> Result<SubscribeOutcome> {
        if !self.registry.is_valid(topic) {
            return Err(PubSubError::InvalidTopic(topic.to_string()));
        }
        self.registry.validate_params(topic, &params)?;

        let outcome = self.table.subscribe(connection, topic, params);
        info!(connection, topic, ?outcome, "subscribed");
        Ok(outcome)
    }

    /// Remove `connection`'s subscription to `topic`. Not subscribed is not an error.
    pub fn unsubscribe(&self, connection: ConnectionId, topic: &str) -> Result<()> {
        if self.table.unsubscribe(connection, topic) {
            info!(connection, topic, "unsubscribed");
        } else {
            debug!(connection, topic, "unsubscribe for absent subscription");
        }
        Ok(())
    }

    /// Drop every subscription held by `connection`. Safe to call for
    /// connections that never subscribed and safe to repeat.
    pub fn remove_connection(&self, connection: ConnectionId) {
        let removed = self.table.remove_connection(connection);
        if removed > 0 {
            info!(connection, removed, "removed connection subscriptions");
        }
    }

    pub fn subscribers_of(&self, topic: &str) -> Vec<Subscriber> {
        self.table.subscribers_of(topic)
    }

    /// Deliver `data` to every subscriber of `topic`. Returns how many
    /// subscribers it reached.
    pub fn publish(&self, topic: &str, data: &Value) -> usize {
        self.publish_with_report(topic, data).delivered
    }

    /// Same as [`Broker::publish`].
    pub fn broadcast(&self, topic: &str, data: &Value) -> usize {
        self.publish(topic, data)
    }

    pub fn publish_with_report(&self, topic: &str, data: &Value) -> PublishReport {
        let mut report = PublishReport::default();

        let subscribers = self.table.subscribers_of(topic);
        if subscribers.is_empty() {
            debug!(topic, "no subscribers");
            return report;
        }

        let shared_frame = match Envelope::new(topic, data).to_frame() {
            Ok(frame) => frame,
            Err(e) => {
                warn!(topic, error = %e, "failed to serialize payload");
                return report;
            }
        };
        let filter = self.registry.filter_for(topic);

        for subscriber in &subscribers {
            let active_filter = filter.as_ref().filter(|_| !subscriber.params.is_empty());
            let out = match active_filter {
                Some(filter) => {
                    let admitted = {
                        let state = subscriber.state.lock();
                        filter.admit(&subscriber.params, data, state.last_delivered.as_ref())
                    };
                    if !admitted {
                        report.suppressed += 1;
                        continue;
                    }
                    filter.transform(&subscriber.params, Cow::Borrowed(data))
                }
                None => Cow::Borrowed(data),
            };

            let owned_frame;
            let frame: &str = match out {
                Cow::Borrowed(_) => &shared_frame,
                Cow::Owned(value) => match Envelope::new(topic, &value).to_frame() {
                    Ok(frame) => {
                        owned_frame = frame;
                        &owned_frame
                    }
                    Err(e) => {
                        warn!(topic, connection = subscriber.connection, error = %e, "failed to serialize payload");
                        report.failed += 1;
                        continue;
                    }
                },
            };

            match self.transport.send(subscriber.connection, frame) {
                Ok(()) => {
                    report.delivered += 1;
                    if active_filter.is_some() {
                        subscriber.state.lock().last_delivered = Some(data.clone());
                    }
                }
                Err(e) => {
                    warn!(topic, connection = subscriber.connection, error = %e, "delivery failed");
                    report.failed += 1;
                }
            }
        }

        debug!(
            topic,
            recipients = subscribers.len(),
            delivered = report.delivered,
            suppressed = report.suppressed,
            failed = report.failed,
            "broadcast"
        );
        report
    }

    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.table.subscriber_count(topic)
    }

    pub fn topics_of(&self, connection: ConnectionId) -> Vec<String> {
        self.table.topics_of(connection)
    }

    pub fn is_subscribed(&self, connection: ConnectionId, topic: &str) -> bool {
        self.table.is_subscribed(connection, topic)
    }

    pub fn params_of(&self, connection: ConnectionId, topic: &str) -> Option<Params> {
        self.table.params_of(connection, topic)
    }

    pub fn connection_state(&self, connection: ConnectionId) -> ConnectionState {
        if self.table.topics_of(connection).is_empty() {
            ConnectionState::Unknown
        } else {
            ConnectionState::Active
        }
    }

    pub fn topic_count(&self) -> usize {
        self.table.topic_count()
    }

    pub fn connection_count(&self) -> usize {
        self.table.connection_count()
    }

    /// Clear every subscription. Called once when the server stops.
    pub fn shutdown(&self) {
        self.table.clear();
        info!("subscription table cleared");
    }

    #[cfg(test)]
    pub(crate) fn table(&self) -> &SubscriptionTable {
        &self.table
    }
}
