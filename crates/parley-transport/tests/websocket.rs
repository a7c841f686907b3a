//! Integration tests for the WebSocket broker and client.
//!
//! These spin up a real broker on an OS-assigned port and connect real
//! clients to it.

#[cfg(feature = "websocket")]
mod websocket {
    use std::time::Duration;

    use parley_transport::{
        Credentials, EventStream, PubSub, TransportError, TransportEvent, WsBroker,
        WsClient,
    };

    /// Starts a broker on a random port and returns its `ws://` URL.
    async fn start_broker(credentials: Option<Credentials>) -> String {
        let mut broker = WsBroker::bind("127.0.0.1:0").await.expect("should bind");
        if let Some(credentials) = credentials {
            broker = broker.require_credentials(credentials);
        }
        let addr = broker.local_addr().expect("bound address");
        tokio::spawn(async move {
            let _ = broker.run().await;
        });
        format!("ws://{addr}")
    }

    async fn next_event(events: &mut EventStream) -> TransportEvent {
        tokio::time::timeout(Duration::from_secs(5), events.recv())
            .await
            .expect("timed out waiting for event")
            .expect("event stream closed")
    }

    async fn connected(url: &str) -> (WsClient, EventStream) {
        let (client, mut events) = WsClient::connect(url, Credentials::default())
            .await
            .expect("should connect");
        assert!(matches!(next_event(&mut events).await, TransportEvent::Connected));
        (client, events)
    }

    #[tokio::test]
    async fn test_publish_is_routed_to_wildcard_subscriber() {
        let url = start_broker(None).await;
        let (alice, mut alice_events) = connected(&url).await;
        let (bob, _bob_events) = connected(&url).await;

        alice.subscribe("room/+/discovery").unwrap();
        // Give the broker a moment to register the subscription.
        tokio::time::sleep(Duration::from_millis(50)).await;

        bob.publish("room/lobby/discovery", br#"{"account":"bob"}"#.to_vec())
            .unwrap();

        match next_event(&mut alice_events).await {
            TransportEvent::Message { topic, payload } => {
                assert_eq!(topic, "room/lobby/discovery");
                assert_eq!(payload, br#"{"account":"bob"}"#);
            }
            other => panic!("expected Message, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_wrong_credentials_are_rejected() {
        let url = start_broker(Some(Credentials::new("chat", "secret"))).await;
        let (_client, mut events) = WsClient::connect(&url, Credentials::new("chat", "nope"))
            .await
            .expect("socket should open");

        assert!(matches!(
            next_event(&mut events).await,
            TransportEvent::Error(TransportError::Unauthorized(_))
        ));
        assert!(matches!(
            next_event(&mut events).await,
            TransportEvent::Disconnected(_)
        ));
    }

    #[tokio::test]
    async fn test_matching_credentials_are_accepted() {
        let url = start_broker(Some(Credentials::new("chat", "secret"))).await;
        let (_client, mut events) = WsClient::connect(&url, Credentials::new("chat", "secret"))
            .await
            .expect("should connect");
        assert!(matches!(next_event(&mut events).await, TransportEvent::Connected));
    }

    #[tokio::test]
    async fn test_publish_rejects_non_utf8_payload() {
        let url = start_broker(None).await;
        let (client, _events) = connected(&url).await;
        let result = client.publish("room/lobby", vec![0xff, 0xfe]);
        assert!(matches!(result, Err(TransportError::InvalidFrame(_))));
    }
}
