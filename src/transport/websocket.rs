//! WebSocket transport
//!
//! Responsibilities:
//! - Accept TCP/WebSocket connections and enforce the connection cap
//! - Give each connection a `Client` with an outbound channel drained by a
//!   writer task, so broadcasts never wait on the socket
//! - Decode inbound text frames and pass them to the broker's lifecycle hooks
//! - Report every disconnect to the broker exactly once, after the last
//!   inbound request of that connection

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures_util::{SinkExt, Stream, StreamExt};
use parking_lot::RwLock;
use serde_json::Value;
use tokio::net::{TcpListener, TcpStream};
use tokio::spawn;
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::accept_async;
use tracing::{debug, info, warn};
use tungstenite::protocol::Message as WsMessage;

use crate::broker::Broker;
use crate::broker::message::{Ack, Reply};
use crate::broker::topic::ConnectionId;
use crate::client::Client;
use crate::transport::Transport;
use crate::utils::{PubSubError, Result};

/// Live WebSocket clients, keyed by the connection id handed to the broker.
#[derive(Debug)]
pub struct WsTransport {
    clients: RwLock<HashMap<ConnectionId, Client>>,
    next_id: AtomicU64,
}

impl Default for WsTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl WsTransport {
    pub fn new() -> Self {
        Self {
            clients: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register a new client unless `max_connections` are already attached.
    pub fn register(
        &self,
        sender: mpsc::UnboundedSender<WsMessage>,
        max_connections: usize,
    ) -> Option<ConnectionId> {
        let mut clients = self.clients.write();
        if clients.len() >= max_connections {
            return None;
        }
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        clients.insert(id, Client::new(id, sender));
        Some(id)
    }

    pub fn unregister(&self, connection: ConnectionId) -> bool {
        self.clients.write().remove(&connection).is_some()
    }

    pub fn connection_count(&self) -> usize {
        self.clients.read().len()
    }
}

impl Transport for WsTransport {
    fn send(&self, connection: ConnectionId, frame: &str) -> Result<()> {
        let clients = self.clients.read();
        let client = clients
            .get(&connection)
            .ok_or(PubSubError::UnknownConnection(connection))?;
        client.send_text(frame)
    }
}

/// Decode one inbound text frame and run it through the hooks. Returns the
/// reply frame to send back, if it could be encoded.
pub fn handle_text(broker: &Broker, connection: ConnectionId, text: &str) -> Option<String> {
    let reply = match serde_json::from_str::<Value>(text) {
        Ok(raw) => broker.handle_request(connection, &raw),
        Err(e) => {
            warn!(
                connection,
                "Invalid client message: {e} | {}",
                text.chars().take(100).collect::<String>()
            );
            Reply::Ack(Ack::error("", format!("invalid JSON: {e}")))
        }
    };

    match reply.to_frame() {
        Ok(frame) => Some(frame),
        Err(e) => {
            warn!(connection, error = %e, "failed to encode reply");
            None
        }
    }
}

pub async fn start_websocket_server(
    addr: &str,
    broker: Arc<Broker>,
    transport: Arc<WsTransport>,
    max_connections: usize,
) -> Result<()> {
    let listener = TcpListener::bind(addr).await?;

    info!("WebSocket server listening on ws://{addr}");

    serve(listener, broker, transport, max_connections).await;
    Ok(())
}

/// Accept loop over an already bound listener.
pub async fn serve(
    listener: TcpListener,
    broker: Arc<Broker>,
    transport: Arc<WsTransport>,
    max_connections: usize,
) {
    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                warn!("Failed to accept connection: {e}");
                continue;
            }
        };
        debug!(%peer, "TCP connection accepted");

        spawn(handle_connection(
            stream,
            broker.clone(),
            transport.clone(),
            max_connections,
        ));
    }
}

async fn handle_connection(
    stream: TcpStream,
    broker: Arc<Broker>,
    transport: Arc<WsTransport>,
    max_connections: usize,
) {
    let ws_stream = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            warn!("WebSocket handshake error: {e}");
            return;
        }
    };
    let (mut ws_sender, ws_receiver) = ws_stream.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<WsMessage>();

    let Some(connection) = transport.register(tx, max_connections) else {
        warn!(max_connections, "No free WebSocket slots, closing connection");
        let _ = ws_sender.close().await;
        return;
    };
    info!(connection, "WebSocket client connected");

    let (writer_closed_tx, writer_closed) = oneshot::channel::<()>();

    spawn(async move {
        while let Some(msg) = rx.recv().await {
            if let Err(e) = ws_sender.send(msg).await {
                warn!(connection, "Failed to send message: {e}");
                break;
            }
        }

        let _ = writer_closed_tx.send(());
        debug!(connection, "Send loop closed");
    });

    read_loop(ws_receiver, writer_closed, &broker, &transport, connection).await;
}

/// Feed inbound frames to the hooks until the peer goes away or the writer
/// gives up, then report the disconnect.
///
/// This is the only place a live connection is unregistered, and it runs
/// after the last inbound request was handled, so no subscription can
/// outlive its connection.
pub(crate) async fn read_loop<S>(
    mut frames: S,
    mut writer_closed: oneshot::Receiver<()>,
    broker: &Broker,
    transport: &WsTransport,
    connection: ConnectionId,
) where
    S: Stream<Item = tungstenite::Result<WsMessage>> + Unpin,
{
    loop {
        let frame = tokio::select! {
            biased;
            _ = &mut writer_closed => {
                debug!(connection, "Writer closed, stopping reader");
                break;
            }
            frame = frames.next() => frame,
        };

        let msg = match frame {
            Some(Ok(msg)) => msg,
            Some(Err(e)) => {
                debug!(connection, "WebSocket read error: {e}");
                break;
            }
            None => break,
        };

        match msg {
            WsMessage::Text(text) => {
                if let Some(reply) = handle_text(broker, connection, text.as_str()) {
                    if let Err(e) = transport.send(connection, &reply) {
                        debug!(connection, error = %e, "Reply dropped");
                    }
                }
            }
            WsMessage::Close(_) => break,
            _ => {}
        }
    }

    transport.unregister(connection);
    broker.on_disconnect(connection);
    info!(connection, "WebSocket client disconnected");
}
