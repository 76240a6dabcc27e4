//! The `error` module defines the error type shared by every layer of `pushsub`.
//!
//! Validation errors (`InvalidTopic`, `MalformedRequest`) are turned into error
//! acknowledgements by the lifecycle hooks. Delivery errors are logged and
//! counted by the broadcast engine. Only configuration errors and I/O errors
//! while binding the listener are allowed to abort the process.

use thiserror::Error;

use crate::broker::topic::ConnectionId;

#[derive(Debug, Error)]
pub enum PubSubError {
    /// The registry runs in strict mode and does not know this topic.
    #[error("unknown topic '{0}'")]
    InvalidTopic(String),

    /// A subscribe/unsubscribe request is missing fields or carries bad ones.
    #[error("malformed request: {0}")]
    MalformedRequest(String),

    /// Sending a frame to one subscriber failed.
    #[error("delivery to connection {connection} failed: {reason}")]
    DeliveryFailure {
        connection: ConnectionId,
        reason: String,
    },

    /// The transport has no live link for this connection.
    #[error("unknown connection {0}")]
    UnknownConnection(ConnectionId),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<config::ConfigError> for PubSubError {
    fn from(err: config::ConfigError) -> Self {
        PubSubError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PubSubError>;
