//! Wire messages exchanged with subscribers
//!
//! Inbound requests arrive as already-decoded JSON values:
//! `{ "action": "subscribe" | "unsubscribe" | "ping", "topic": "...", "params": {...} }`.
//! Outbound frames are acknowledgements (`{ "status", "topic", "reason"? }`),
//! broadcast envelopes (`{ "topic", "data" }`) and `{ "type": "pong" }`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::broker::topic::Params;
use crate::utils::{PubSubError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Subscribe,
    Unsubscribe,
    Ping,
}

impl Action {
    pub fn parse(raw: &Value) -> Result<Self> {
        match raw.get("action").and_then(Value::as_str) {
            Some("subscribe") => Ok(Action::Subscribe),
            Some("unsubscribe") => Ok(Action::Unsubscribe),
            Some("ping") => Ok(Action::Ping),
            Some(other) => Err(PubSubError::MalformedRequest(format!(
                "unknown action '{other}'"
            ))),
            None => Err(PubSubError::MalformedRequest(
                "missing 'action' field".to_string(),
            )),
        }
    }
}

/// A validated subscribe or unsubscribe request.
#[derive(Debug, Clone, PartialEq)]
pub struct TopicRequest {
    pub topic: String,
    pub params: Params,
}

impl TopicRequest {
    pub fn parse(raw: &Value) -> Result<Self> {
        if !raw.is_object() {
            return Err(PubSubError::MalformedRequest(
                "request must be a JSON object".to_string(),
            ));
        }

        let topic = match raw.get("topic") {
            Some(Value::String(topic)) if !topic.trim().is_empty() => topic.clone(),
            Some(Value::String(_)) => {
                return Err(PubSubError::MalformedRequest(
                    "'topic' must not be empty".to_string(),
                ));
            }
            Some(_) => {
                return Err(PubSubError::MalformedRequest(
                    "'topic' must be a string".to_string(),
                ));
            }
            None => {
                return Err(PubSubError::MalformedRequest(
                    "missing 'topic' field".to_string(),
                ));
            }
        };

        let params = match raw.get("params") {
            None | Some(Value::Null) => Params::new(),
            Some(Value::Object(params)) => params.clone(),
            Some(_) => {
                return Err(PubSubError::MalformedRequest(
                    "'params' must be an object".to_string(),
                ));
            }
        };

        Ok(Self { topic, params })
    }
}

/// Topic named by a raw request, if any. Used to label error acks.
pub fn topic_hint(raw: &Value) -> String {
    raw.get("topic")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AckStatus {
    Ok,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
    pub status: AckStatus,
    pub topic: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl Ack {
    pub fn ok(topic: impl Into<String>) -> Self {
        Self {
            status: AckStatus::Ok,
            topic: topic.into(),
            reason: None,
        }
    }

    pub fn error(topic: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            status: AckStatus::Error,
            topic: topic.into(),
            reason: Some(reason.into()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == AckStatus::Ok
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pong {
    #[serde(rename = "type")]
    pub kind: String,
}

impl Default for Pong {
    fn default() -> Self {
        Self {
            kind: "pong".to_string(),
        }
    }
}

/// What the hooks send back for one inbound request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Reply {
    Ack(Ack),
    Pong(Pong),
}

impl Reply {
    pub fn to_frame(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Broadcast payload as seen by subscribers.
#[derive(Debug, Serialize)]
pub struct Envelope<'a> {
    pub topic: &'a str,
    pub data: &'a Value,
}

impl<'a> Envelope<'a> {
    pub fn new(topic: &'a str, data: &'a Value) -> Self {
        Self { topic, data }
    }

    pub fn to_frame(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
