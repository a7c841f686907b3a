//! Integration tests for the in-process broker.

use parley_transport::{MemoryBroker, PubSub, TransportError, TransportEvent};

/// Pops the next event, panicking if the stream is empty.
fn next_event(events: &mut parley_transport::EventStream) -> TransportEvent {
    events.try_recv().expect("an event should be queued")
}

fn expect_message(events: &mut parley_transport::EventStream) -> (String, Vec<u8>) {
    match next_event(events) {
        TransportEvent::Message { topic, payload } => (topic, payload),
        other => panic!("expected Message, got {other:?}"),
    }
}

#[test]
fn test_connect_emits_connected_first() {
    let broker = MemoryBroker::new();
    let (_client, mut events) = broker.connect();
    assert!(matches!(next_event(&mut events), TransportEvent::Connected));
    assert_eq!(broker.client_count(), 1);
}

#[test]
fn test_publish_reaches_matching_subscribers_including_self() {
    let broker = MemoryBroker::new();
    let (alice, mut alice_events) = broker.connect();
    let (bob, mut bob_events) = broker.connect();
    let _ = next_event(&mut alice_events);
    let _ = next_event(&mut bob_events);

    alice.subscribe("room/+/discovery").unwrap();
    bob.subscribe("room/+/discovery").unwrap();

    alice.publish("room/lobby/discovery", b"hi".to_vec()).unwrap();

    assert_eq!(
        expect_message(&mut alice_events),
        ("room/lobby/discovery".to_string(), b"hi".to_vec())
    );
    assert_eq!(
        expect_message(&mut bob_events),
        ("room/lobby/discovery".to_string(), b"hi".to_vec())
    );
}

#[test]
fn test_publish_skips_non_matching_subscribers() {
    let broker = MemoryBroker::new();
    let (alice, mut alice_events) = broker.connect();
    let _ = next_event(&mut alice_events);
    alice.subscribe("room/global").unwrap();

    assert_eq!(broker.publish("room/lobby", b"x".to_vec()), 0);
    assert!(alice_events.try_recv().is_err());
}

#[test]
fn test_overlapping_subscriptions_deliver_once() {
    let broker = MemoryBroker::new();
    let (alice, mut events) = broker.connect();
    let _ = next_event(&mut events);
    alice.subscribe("room/lobby").unwrap();
    alice.subscribe("room/#").unwrap();
    alice.subscribe("room/lobby").unwrap();

    assert_eq!(broker.publish("room/lobby", b"x".to_vec()), 1);
    let _ = expect_message(&mut events);
    assert!(events.try_recv().is_err());
}

#[test]
fn test_subscribe_rejects_malformed_filter() {
    let broker = MemoryBroker::new();
    let (alice, _events) = broker.connect();
    let result = alice.subscribe("room/#/discovery");
    assert!(matches!(result, Err(TransportError::InvalidFilter(_))));
}

#[test]
fn test_disconnect_notifies_and_fails_later_calls() {
    let broker = MemoryBroker::new();
    let (alice, mut events) = broker.connect();
    let _ = next_event(&mut events);

    broker.disconnect(alice.id());

    assert!(matches!(
        next_event(&mut events),
        TransportEvent::Disconnected(_)
    ));
    assert!(matches!(
        alice.publish("room/lobby", Vec::new()),
        Err(TransportError::Shutdown)
    ));
    assert!(matches!(
        alice.subscribe("room/lobby"),
        Err(TransportError::Shutdown)
    ));
}

#[test]
fn test_dropping_client_detaches_it() {
    let broker = MemoryBroker::new();
    let (alice, _events) = broker.connect();
    assert_eq!(broker.client_count(), 1);
    drop(alice);
    assert_eq!(broker.client_count(), 0);
}
