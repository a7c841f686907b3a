//! Facade tests: clients built with `ClientBuilder` over both transports.

use std::sync::Arc;
use std::time::Duration;

use parley::prelude::*;
use tokio::time::Instant;

struct TokioClock {
    start: Instant,
}

impl Clock for TokioClock {
    fn now(&self) -> Timestamp {
        Timestamp::from_millis(1_700_000_000_000) + self.start.elapsed()
    }
}

async fn until(
    handle: &SessionHandle,
    limit: Duration,
    condition: impl FnMut(&SessionSnapshot) -> bool,
) -> SessionSnapshot {
    let mut rx = handle.watch();
    let snapshot = tokio::time::timeout(limit, rx.wait_for(condition))
        .await
        .expect("condition not reached in time")
        .unwrap();
    SessionSnapshot::clone(&snapshot)
}

fn last_text(snapshot: &SessionSnapshot) -> Option<String> {
    snapshot.current()?.last_message().map(|m| m.text.clone())
}

#[tokio::test(start_paused = true)]
async fn test_memory_clients_chat_and_see_each_other() {
    let broker = MemoryBroker::new();
    let clock: Arc<dyn Clock> = Arc::new(TokioClock {
        start: Instant::now(),
    });
    let alice = ClientBuilder::new()
        .account("alice")
        .clock(clock.clone())
        .connect_memory(&broker)
        .unwrap();
    let bob = ClientBuilder::new()
        .account("bob")
        .clock(clock)
        .connect_memory(&broker)
        .unwrap();

    until(&bob, Duration::from_secs(10), |s| {
        s.current().is_some_and(|r| r.online_members().iter().any(|a| a.as_str() == "alice"))
    })
    .await;

    alice.change_draft("hi bob").await.unwrap();
    alice.send_draft().await.unwrap();

    let snapshot = until(&bob, Duration::from_secs(10), |s| {
        last_text(s).as_deref() == Some("hi bob")
    })
    .await;
    assert_eq!(snapshot.account.as_str(), "bob");
}

#[tokio::test]
async fn test_connect_without_broker_is_config_error() {
    let result = ClientBuilder::new().connect(&ClientConfig::default()).await;
    assert!(matches!(result, Err(ParleyError::Config(_))));
}

#[tokio::test]
async fn test_connect_to_unreachable_broker_is_transport_error() {
    // Grab a free port, then close it again.
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let config = ClientConfig {
        broker_url: Some("127.0.0.1".into()),
        broker_port: Some(port),
        ..ClientConfig::default()
    };

    let result = ClientBuilder::new().connect(&config).await;
    assert!(matches!(result, Err(ParleyError::Transport(_))));
}

#[tokio::test]
async fn test_websocket_clients_exchange_messages() {
    let broker = WsBroker::bind("127.0.0.1:0").await.unwrap();
    let addr = broker.local_addr().unwrap();
    tokio::spawn(broker.run());

    let config = ClientConfig {
        broker_url: Some(addr.ip().to_string()),
        broker_port: Some(addr.port()),
        ..ClientConfig::default()
    };
    let alice = ClientBuilder::new().account("alice").connect(&config).await.unwrap();
    let bob = ClientBuilder::new().account("bob").connect(&config).await.unwrap();

    until(&alice, Duration::from_secs(5), |s| s.connected).await;
    until(&bob, Duration::from_secs(5), |s| s.connected).await;

    alice.add_room("lobby").await.unwrap();
    until(&bob, Duration::from_secs(5), |s| s.rooms.contains("lobby")).await;
    bob.open_room("lobby").await.unwrap();

    bob.change_draft("over the wire").await.unwrap();
    bob.send_draft().await.unwrap();

    let snapshot = until(&alice, Duration::from_secs(5), |s| {
        last_text(s).as_deref() == Some("over the wire")
    })
    .await;
    assert_eq!(snapshot.current_room.as_str(), "lobby");
}
