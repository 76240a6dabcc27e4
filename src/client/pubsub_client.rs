use tokio::sync::mpsc::UnboundedSender;
use tungstenite::protocol::Message as WsMessage;

use crate::broker::topic::ConnectionId;
use crate::utils::{PubSubError, Result};

/// Represents a connected WebSocket client.
///
/// Each client is identified by the connection id the transport assigned to
/// it and owns the sending half of the channel drained by its socket writer.
#[derive(Debug)]
pub struct Client {
    pub id: ConnectionId,

    /// Channel to send WebSocket messages to the client.
    pub sender: UnboundedSender<WsMessage>,
}

impl Client {
    pub fn new(id: ConnectionId, sender: UnboundedSender<WsMessage>) -> Self {
        Self { id, sender }
    }

    /// Queue a text frame. Fails once the writer side has gone away.
    pub fn send_text(&self, frame: &str) -> Result<()> {
        self.sender
            .send(WsMessage::text(frame.to_owned()))
            .map_err(|e| PubSubError::DeliveryFailure {
                connection: self.id,
                reason: e.to_string(),
            })
    }
}
