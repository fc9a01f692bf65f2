use super::{Client, ConnectionRegistry};
use crate::utils::error::BrokerError;
use tokio::sync::mpsc;
use tungstenite::protocol::Message as WsMessage;

fn client(id: &str, capacity: usize) -> (Client, mpsc::Receiver<WsMessage>) {
    let (tx, rx) = mpsc::channel::<WsMessage>(capacity);
    (Client::new(id.to_string(), tx), rx)
}

#[test]
fn test_client_new() {
    let (client, _rx) = client("client-1", 4);
    assert_eq!(client.id, "client-1");
    assert!(client.channels.is_empty());
    assert!(!client.is_closed());
}

#[test]
fn test_client_deliver_reports_backpressure() {
    let (client, mut rx) = client("client-1", 1);

    client.deliver(WsMessage::text("first")).unwrap();
    let err = client.deliver(WsMessage::text("second")).unwrap_err();
    assert!(matches!(err, BrokerError::Backpressure(ref id) if id == "client-1"));

    assert_eq!(rx.try_recv().unwrap().to_text().unwrap(), "first");
}

#[test]
fn test_client_deliver_reports_closed() {
    let (client, rx) = client("client-1", 4);
    drop(rx);

    assert!(client.is_closed());
    let err = client.deliver(WsMessage::text("hello")).unwrap_err();
    assert!(matches!(err, BrokerError::Closed(_)));
}

#[test]
fn test_registry_register_and_unregister() {
    let mut registry = ConnectionRegistry::new();
    let (c, _rx) = client("client-1", 4);

    registry.register(c).unwrap();
    assert!(registry.contains("client-1"));
    assert_eq!(registry.len(), 1);

    let removed = registry.unregister("client-1").unwrap();
    assert_eq!(removed.id, "client-1");
    assert!(registry.is_empty());
    assert!(registry.unregister("client-1").is_none());
}

#[test]
fn test_registry_rejects_duplicate_identity() {
    let mut registry = ConnectionRegistry::new();
    let (first, _rx1) = client("client-1", 4);
    let (second, _rx2) = client("client-1", 4);

    registry.register(first).unwrap();
    let err = registry.register(second).unwrap_err();
    assert!(matches!(err, BrokerError::DuplicateIdentity(ref id) if id == "client-1"));
    assert_eq!(registry.len(), 1);
}

#[test]
fn test_registry_send_to_unknown_connection() {
    let registry = ConnectionRegistry::new();
    let err = registry.send("ghost", WsMessage::text("hi")).unwrap_err();
    assert!(matches!(err, BrokerError::UnknownConnection(_)));
}

#[test]
fn test_registry_send_routes_to_the_right_queue() {
    let mut registry = ConnectionRegistry::new();
    let (a, mut rx_a) = client("a", 4);
    let (b, mut rx_b) = client("b", 4);
    registry.register(a).unwrap();
    registry.register(b).unwrap();

    registry.send("b", WsMessage::text("for-b")).unwrap();

    assert!(rx_a.try_recv().is_err());
    assert_eq!(rx_b.try_recv().unwrap().to_text().unwrap(), "for-b");
    let mut ids: Vec<_> = registry.ids().cloned().collect();
    ids.sort();
    assert_eq!(ids, vec!["a".to_string(), "b".to_string()]);
}

#[tokio::test]
async fn test_shut_down_is_seen_by_a_later_waiter() {
    let (client, _rx) = client("client-1", 4);
    let signal = client.shutdown_signal();

    client.shut_down();

    tokio::time::timeout(std::time::Duration::from_millis(100), signal.notified())
        .await
        .expect("shutdown permit was lost");
}
