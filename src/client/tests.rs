use super::pubsub_client::Client;
use crate::utils::PubSubError;
use tokio::sync::mpsc;
use tungstenite::protocol::Message as WsMessage;

#[test]
fn test_client_send_text() {
    let (tx, mut rx) = mpsc::unbounded_channel::<WsMessage>();
    let client = Client::new(7, tx);
    assert_eq!(client.id, 7);

    client.send_text("{\"a\":1}").unwrap();
    match rx.try_recv().unwrap() {
        WsMessage::Text(text) => assert_eq!(text.as_str(), "{\"a\":1}"),
        other => panic!("Expected a text message, got {other:?}"),
    }
}

#[test]
fn test_client_send_after_receiver_dropped() {
    let (tx, rx) = mpsc::unbounded_channel::<WsMessage>();
    let client = Client::new(3, tx);
    drop(rx);

    let err = client.send_text("hello").unwrap_err();
    assert!(matches!(
        err,
        PubSubError::DeliveryFailure { connection: 3, .. }
    ));
}
