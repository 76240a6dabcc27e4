//! # pushsub
//!
//! `pushsub` pushes status updates to dashboard clients over WebSocket
//! instead of having them poll. Clients subscribe to named topics
//! (`device.status`, `ota.progress`, `system.info`, ...) and receive only the
//! JSON payloads published on those topics.
//!
//! ## Core Modules
//!
//! - `broker`: subscription table, broadcast engine and lifecycle hooks.
//! - `registry`: known topics, their parameter schemas and delivery filters.
//! - `transport`: the send primitive the broker depends on and the WebSocket server.
//! - `client`: one connected WebSocket client as seen by the transport.
//! - `config`: loading settings from file and environment.
//! - `status`: the periodic `system.info` publisher.
//! - `utils`: error type and logging.

pub mod broker;
pub mod client;
pub mod config;
pub mod registry;
pub mod status;
pub mod transport;
pub mod utils;
