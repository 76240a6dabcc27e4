//! Lifecycle hooks called by the transport.
//!
//! Requests are validated here and every outcome, good or bad, becomes an
//! [`Ack`]. A malformed request never reaches the subscription table.

use serde_json::Value;
use tracing::warn;

use crate::broker::engine::Broker;
use crate::broker::message::{Action, Ack, Pong, Reply, TopicRequest, topic_hint};
use crate::broker::topic::ConnectionId;

impl Broker {
    /// Dispatch one decoded client message on its `action`.
    pub fn handle_request(&self, connection: ConnectionId, raw: &Value) -> Reply {
        match Action::parse(raw) {
            Ok(Action::Subscribe) => Reply::Ack(self.on_subscribe_request(connection, raw)),
            Ok(Action::Unsubscribe) => Reply::Ack(self.on_unsubscribe_request(connection, raw)),
            Ok(Action::Ping) => Reply::Pong(Pong::default()),
            Err(e) => {
                warn!(connection, error = %e, "rejected request");
                Reply::Ack(Ack::error(topic_hint(raw), e.to_string()))
            }
        }
    }

    pub fn on_subscribe_request(&self, connection: ConnectionId, raw: &Value) -> Ack {
        let result = TopicRequest::parse(raw)
            .and_then(|req| self.subscribe(connection, &req.topic, req.params).map(|_| req.topic));

        match result {
            Ok(topic) => Ack::ok(topic),
            Err(e) => {
                warn!(connection, error = %e, "subscribe rejected");
                Ack::error(topic_hint(raw), e.to_string())
            }
        }
    }

    pub fn on_unsubscribe_request(&self, connection: ConnectionId, raw: &Value) -> Ack {
        let result = TopicRequest::parse(raw)
            .and_then(|req| self.unsubscribe(connection, &req.topic).map(|_| req.topic));

        match result {
            Ok(topic) => Ack::ok(topic),
            Err(e) => {
                warn!(connection, error = %e, "unsubscribe rejected");
                Ack::error(topic_hint(raw), e.to_string())
            }
        }
    }

    /// The transport lost `connection`. Idempotent.
    pub fn on_disconnect(&self, connection: ConnectionId) {
        self.remove_connection(connection);
    }
}
