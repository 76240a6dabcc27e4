//! Periodic `system.info` publisher.
//!
//! Stands in for the application-side publishers (device polling, OTA
//! progress) that push into the broker. It skips a tick when nobody is
//! subscribed.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::broker::Broker;
use crate::transport::WsTransport;

pub const SYSTEM_INFO_TOPIC: &str = "system.info";

/// Build one `system.info` payload.
pub fn system_info(uptime: Duration, connections: usize, topics: usize) -> Value {
    json!({
        "uptime_secs": uptime.as_secs(),
        "connections": connections,
        "topics": topics,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    })
}

/// Publish `system.info` every `period`. A zero period disables the publisher.
pub async fn run_system_info(broker: Arc<Broker>, transport: Arc<WsTransport>, period: Duration) {
    if period.is_zero() {
        warn!("system.info publisher disabled: zero interval");
        return;
    }

    let started = Instant::now();
    let mut ticker = tokio::time::interval(period);

    loop {
        ticker.tick().await;

        if broker.subscriber_count(SYSTEM_INFO_TOPIC) == 0 {
            continue;
        }

        let data = system_info(
            started.elapsed(),
            transport.connection_count(),
            broker.topic_count(),
        );
        let delivered = broker.publish(SYSTEM_INFO_TOPIC, &data);
        debug!(delivered, "published {SYSTEM_INFO_TOPIC}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::TopicRegistry;
    use tokio::sync::mpsc;
    use tungstenite::protocol::Message as WsMessage;

    #[test]
    fn system_info_payload_fields() {
        let info = system_info(Duration::from_secs(90), 2, 3);
        assert_eq!(info["uptime_secs"], 90);
        assert_eq!(info["connections"], 2);
        assert_eq!(info["topics"], 3);
        assert!(info["timestamp"].is_string());
    }

    #[tokio::test]
    async fn zero_period_returns_immediately() {
        let transport = Arc::new(WsTransport::new());
        let broker = Arc::new(Broker::new(TopicRegistry::permissive(), transport.clone()));

        tokio::time::timeout(
            Duration::from_secs(5),
            run_system_info(broker, transport, Duration::ZERO),
        )
        .await
        .expect("publisher with a zero period should return");
    }

    #[tokio::test]
    async fn publishes_to_subscribers() {
        let transport = Arc::new(WsTransport::new());
        let broker = Arc::new(Broker::new(TopicRegistry::permissive(), transport.clone()));
        let (tx, mut rx) = mpsc::unbounded_channel::<WsMessage>();
        let connection = transport.register(tx, 4).unwrap();
        broker
            .subscribe(connection, SYSTEM_INFO_TOPIC, Default::default())
            .unwrap();

        let task = tokio::spawn(run_system_info(
            broker.clone(),
            transport.clone(),
            Duration::from_millis(10),
        ));

        let msg = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("timed out")
            .expect("channel closed");
        task.abort();

        let frame: Value = serde_json::from_str(msg.to_text().unwrap()).unwrap();
        assert_eq!(frame["topic"], SYSTEM_INFO_TOPIC);
        assert_eq!(frame["data"]["connections"], 1);
    }
}
