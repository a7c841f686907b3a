//! Publish/subscribe over WebSocket using `tokio-tungstenite`.
//!
//! Every WebSocket message is one JSON text frame tagged by `op`:
//!
//! ```text
//! client → broker   {"op":"connect","username":..,"password":..}
//! broker → client   {"op":"conn_ack"}
//! client → broker   {"op":"subscribe","filter":"room/+/discovery"}
//! client → broker   {"op":"publish","topic":"room/lobby","payload":"..."}
//! broker → client   {"op":"message","topic":"room/lobby","payload":"..."}
//! broker → client   {"op":"error","message":"..."}
//! ```
//!
//! The first client frame must be `connect`. Payloads are UTF-8 strings.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures_util::{Sink, SinkExt, Stream, StreamExt};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::{self, Message};

use crate::{
    ClientId, Credentials, EventStream, PubSub, TransportError, TransportEvent, topic_matches,
    validate_filter,
};

/// Counter for generating unique peer IDs on a broker.
static NEXT_PEER_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum Frame {
    Connect {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        username: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        password: Option<String>,
    },
    ConnAck,
    Subscribe {
        filter: String,
    },
    Publish {
        topic: String,
        payload: String,
    },
    Message {
        topic: String,
        payload: String,
    },
    Error {
        message: String,
    },
}

fn encode(frame: &Frame) -> Result<Message, TransportError> {
    let text = serde_json::to_string(frame)
        .map_err(|e| TransportError::InvalidFrame(e.to_string()))?;
    Ok(Message::Text(text.into()))
}

/// Reads the next frame, skipping control messages.
///
/// Returns `Ok(None)` when the peer closed the socket.
async fn next_frame<S>(stream: &mut S) -> Result<Option<Frame>, TransportError>
where
    S: Stream<Item = Result<Message, tungstenite::Error>> + Unpin,
{
    loop {
        match stream.next().await {
            Some(Ok(Message::Text(text))) => {
                return serde_json::from_str(text.as_str())
                    .map(Some)
                    .map_err(|e| TransportError::InvalidFrame(e.to_string()));
            }
            Some(Ok(Message::Binary(data))) => {
                return serde_json::from_slice(&data)
                    .map(Some)
                    .map_err(|e| TransportError::InvalidFrame(e.to_string()));
            }
            Some(Ok(Message::Close(_))) | None => return Ok(None),
            Some(Ok(_)) => continue, // ping/pong/raw frame
            Some(Err(e)) => return Err(TransportError::ReceiveFailed(e.to_string())),
        }
    }
}

/// Drains `outbox` into the socket until either side goes away.
async fn write_frames<S>(
    mut sink: S,
    mut outbox: mpsc::UnboundedReceiver<Frame>,
    errors: Option<mpsc::UnboundedSender<TransportEvent>>,
) where
    S: Sink<Message, Error = tungstenite::Error> + Unpin,
{
    while let Some(frame) = outbox.recv().await {
        let result = match encode(&frame) {
            Ok(msg) => sink
                .send(msg)
                .await
                .map_err(|e| TransportError::SendFailed(e.to_string())),
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            tracing::debug!(error = %e, "websocket write failed");
            if let Some(errors) = &errors {
                let _ = errors.send(TransportEvent::Error(e));
            }
            break;
        }
    }
    let _ = sink.close().await;
}

// ---------------------------------------------------------------------------
// Broker
// ---------------------------------------------------------------------------

struct Peer {
    filters: Vec<String>,
    outbox: mpsc::UnboundedSender<Frame>,
}

#[derive(Default)]
struct Hub {
    peers: HashMap<ClientId, Peer>,
}

impl Hub {
    fn route(&mut self, topic: &str, payload: &str) -> usize {
        let mut delivered = 0;
        self.peers.retain(|_, peer| {
            if !peer.filters.iter().any(|f| topic_matches(f, topic)) {
                return true;
            }
            let frame = Frame::Message {
                topic: topic.to_string(),
                payload: payload.to_string(),
            };
            let alive = peer.outbox.send(frame).is_ok();
            if alive {
                delivered += 1;
            }
            alive
        });
        delivered
    }
}

/// A minimal WebSocket publish/subscribe broker.
///
/// Routing is in-memory; there is no retention and no persistence.
pub struct WsBroker {
    listener: TcpListener,
    hub: Arc<Mutex<Hub>>,
    credentials: Option<Credentials>,
}

impl WsBroker {
    /// Binds the broker to the given address.
    pub async fn bind(addr: &str) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(TransportError::AcceptFailed)?;
        tracing::info!(addr, "WebSocket broker listening");
        Ok(Self {
            listener,
            hub: Arc::new(Mutex::new(Hub::default())),
            credentials: None,
        })
    }

    /// Only accept clients presenting exactly these credentials.
    pub fn require_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Returns the local address the broker is bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Runs the accept loop until the process ends.
    pub async fn run(self) -> Result<(), TransportError> {
        let credentials = Arc::new(self.credentials);
        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    let hub = Arc::clone(&self.hub);
                    let credentials = Arc::clone(&credentials);
                    tokio::spawn(async move {
                        if let Err(e) = serve_peer(stream, addr, hub, &credentials).await {
                            tracing::debug!(%addr, error = %e, "peer ended with error");
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}

async fn serve_peer(
    stream: TcpStream,
    addr: SocketAddr,
    hub: Arc<Mutex<Hub>>,
    credentials: &Option<Credentials>,
) -> Result<(), TransportError> {
    let ws = tokio_tungstenite::accept_async(stream).await.map_err(|e| {
        TransportError::AcceptFailed(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            e,
        ))
    })?;
    let (mut sink, mut stream) = ws.split();

    let presented = match next_frame(&mut stream).await? {
        Some(Frame::Connect { username, password }) => Credentials { username, password },
        _ => {
            let reply = Frame::Error {
                message: "first frame must be connect".into(),
            };
            let _ = sink.send(encode(&reply)?).await;
            return Err(TransportError::InvalidFrame("expected connect".into()));
        }
    };

    if let Some(required) = credentials {
        if *required != presented {
            let reply = Frame::Error {
                message: "bad credentials".into(),
            };
            let _ = sink.send(encode(&reply)?).await;
            return Err(TransportError::Unauthorized(addr.to_string()));
        }
    }

    sink.send(encode(&Frame::ConnAck)?)
        .await
        .map_err(|e| TransportError::SendFailed(e.to_string()))?;

    let id = ClientId::new(NEXT_PEER_ID.fetch_add(1, Ordering::Relaxed));
    let (outbox, outbox_rx) = mpsc::unbounded_channel();
    hub.lock().peers.insert(
        id,
        Peer {
            filters: Vec::new(),
            outbox: outbox.clone(),
        },
    );
    let writer = tokio::spawn(write_frames(sink, outbox_rx, None));
    tracing::debug!(%id, %addr, "peer connected");

    let result = read_peer_frames(id, &mut stream, &hub, &outbox).await;

    hub.lock().peers.remove(&id);
    writer.abort();
    tracing::debug!(%id, %addr, "peer disconnected");
    result
}

async fn read_peer_frames<S>(
    id: ClientId,
    stream: &mut S,
    hub: &Mutex<Hub>,
    outbox: &mpsc::UnboundedSender<Frame>,
) -> Result<(), TransportError>
where
    S: Stream<Item = Result<Message, tungstenite::Error>> + Unpin,
{
    loop {
        let frame = match next_frame(stream).await {
            Ok(Some(frame)) => frame,
            Ok(None) => return Ok(()),
            Err(TransportError::InvalidFrame(reason)) => {
                let _ = outbox.send(Frame::Error { message: reason });
                continue;
            }
            Err(e) => return Err(e),
        };

        match frame {
            Frame::Subscribe { filter } => {
                if let Err(e) = validate_filter(&filter) {
                    let _ = outbox.send(Frame::Error {
                        message: e.to_string(),
                    });
                    continue;
                }
                if let Some(peer) = hub.lock().peers.get_mut(&id) {
                    if !peer.filters.contains(&filter) {
                        peer.filters.push(filter);
                    }
                }
            }
            Frame::Publish { topic, payload } => {
                let delivered = hub.lock().route(&topic, &payload);
                tracing::trace!(%id, topic, delivered, "routed publish");
            }
            other => {
                tracing::debug!(%id, frame = ?other, "unexpected frame from peer");
                let _ = outbox.send(Frame::Error {
                    message: "unexpected frame".into(),
                });
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// A client connection to a [`WsBroker`] (or any broker speaking the same
/// frames).
///
/// Dropping the client closes the connection.
pub struct WsClient {
    outbox: mpsc::UnboundedSender<Frame>,
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
}

impl WsClient {
    /// Connects to `url` (e.g. `ws://127.0.0.1:1883`) and sends the
    /// `connect` frame.
    ///
    /// [`TransportEvent::Connected`] arrives on the returned stream once the
    /// broker acknowledges.
    pub async fn connect(
        url: &str,
        credentials: Credentials,
    ) -> Result<(Self, EventStream), TransportError> {
        let (ws, _) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(|e| TransportError::ConnectFailed(e.to_string()))?;
        let (mut sink, stream) = ws.split();

        let hello = Frame::Connect {
            username: credentials.username,
            password: credentials.password,
        };
        sink.send(encode(&hello)?)
            .await
            .map_err(|e| TransportError::SendFailed(e.to_string()))?;

        let (events, events_rx) = mpsc::unbounded_channel();
        let (outbox, outbox_rx) = mpsc::unbounded_channel();
        let writer = tokio::spawn(write_frames(sink, outbox_rx, Some(events.clone())));
        let reader = tokio::spawn(read_client_frames(stream, events));
        tracing::info!(url, "connecting to WebSocket broker");

        Ok((
            Self {
                outbox,
                reader,
                writer,
            },
            events_rx,
        ))
    }

    fn enqueue(&self, frame: Frame) -> Result<(), TransportError> {
        self.outbox.send(frame).map_err(|_| TransportError::Shutdown)
    }
}

async fn read_client_frames<S>(mut stream: S, events: mpsc::UnboundedSender<TransportEvent>)
where
    S: Stream<Item = Result<Message, tungstenite::Error>> + Unpin,
{
    let mut acked = false;
    let reason = loop {
        let event = match next_frame(&mut stream).await {
            Ok(Some(Frame::ConnAck)) => {
                acked = true;
                TransportEvent::Connected
            }
            Ok(Some(Frame::Message { topic, payload })) => TransportEvent::Message {
                topic,
                payload: payload.into_bytes(),
            },
            Ok(Some(Frame::Error { message })) if !acked => {
                let _ = events.send(TransportEvent::Error(TransportError::Unauthorized(
                    message.clone(),
                )));
                break message;
            }
            Ok(Some(Frame::Error { message })) => {
                TransportEvent::Error(TransportError::InvalidFrame(message))
            }
            Ok(Some(other)) => {
                tracing::debug!(frame = ?other, "unexpected frame from broker");
                continue;
            }
            Ok(None) => break "closed by broker".to_string(),
            Err(e) => {
                let reason = e.to_string();
                let _ = events.send(TransportEvent::Error(e));
                break reason;
            }
        };
        if events.send(event).is_err() {
            return;
        }
    };
    let _ = events.send(TransportEvent::Disconnected(reason));
}

impl PubSub for WsClient {
    fn subscribe(&self, filter: &str) -> Result<(), TransportError> {
        validate_filter(filter)?;
        self.enqueue(Frame::Subscribe {
            filter: filter.to_string(),
        })
    }

    fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), TransportError> {
        let payload = String::from_utf8(payload)
            .map_err(|e| TransportError::InvalidFrame(format!("payload is not UTF-8: {e}")))?;
        self.enqueue(Frame::Publish {
            topic: topic.to_string(),
            payload,
        })
    }
}

impl Drop for WsClient {
    fn drop(&mut self) {
        self.reader.abort();
        self.writer.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_json_shape() {
        let frame = Frame::Publish {
            topic: "room/lobby".into(),
            payload: "{}".into(),
        };
        let json = serde_json::to_string(&frame).unwrap();
        assert_eq!(json, r#"{"op":"publish","topic":"room/lobby","payload":"{}"}"#);
    }

    #[test]
    fn test_frame_connect_omits_missing_credentials() {
        let frame = Frame::Connect {
            username: None,
            password: None,
        };
        assert_eq!(serde_json::to_string(&frame).unwrap(), r#"{"op":"connect"}"#);

        let parsed: Frame = serde_json::from_str(r#"{"op":"connect"}"#).unwrap();
        assert_eq!(parsed, frame);
    }

    #[test]
    fn test_hub_route_skips_non_matching_and_dead_peers() {
        let mut hub = Hub::default();
        let (live_tx, mut live_rx) = mpsc::unbounded_channel();
        let (dead_tx, dead_rx) = mpsc::unbounded_channel();
        drop(dead_rx);
        let (other_tx, mut other_rx) = mpsc::unbounded_channel();

        hub.peers.insert(
            ClientId::new(1),
            Peer {
                filters: vec!["room/+/discovery".into()],
                outbox: live_tx,
            },
        );
        hub.peers.insert(
            ClientId::new(2),
            Peer {
                filters: vec!["room/#".into()],
                outbox: dead_tx,
            },
        );
        hub.peers.insert(
            ClientId::new(3),
            Peer {
                filters: vec!["room/other".into()],
                outbox: other_tx,
            },
        );

        let delivered = hub.route("room/lobby/discovery", "x");
        assert_eq!(delivered, 1);
        assert!(matches!(live_rx.try_recv(), Ok(Frame::Message { .. })));
        assert!(other_rx.try_recv().is_err());
        assert_eq!(hub.peers.len(), 2, "dead peer should be pruned");
    }
}
