//! The `transport` module connects the broker to real clients.
//!
//! The broker only needs the [`Transport`] send primitive. The WebSocket
//! implementation also accepts connections, decodes inbound frames, feeds
//! them to the lifecycle hooks and reports disconnects.

pub mod websocket;

use crate::broker::topic::ConnectionId;
use crate::utils::Result;

pub use websocket::{WsTransport, serve, start_websocket_server};

/// Send primitive the broadcast engine delivers through.
///
/// Implementations must not block on network I/O while holding locks the
/// broker could need.
pub trait Transport: Send + Sync {
    fn send(&self, connection: ConnectionId, frame: &str) -> Result<()>;
}
