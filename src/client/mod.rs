//! The `client` module defines the transport-side representation of one
//! connected WebSocket client: its connection id and its outbound channel.

pub mod pubsub_client;
pub use pubsub_client::Client;

#[cfg(test)]
mod tests;
