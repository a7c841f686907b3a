//! Publish/subscribe transport layer for Parley.
//!
//! The chat core never talks to a network directly. It sees a [`PubSub`]
//! handle for outbound operations and an [`EventStream`] of
//! [`TransportEvent`]s for everything that comes back: connection state,
//! errors, and messages delivered on subscribed topics.
//!
//! Both outbound operations are non-blocking enqueues. A call only fails
//! locally when the connection is gone; failures that happen later on the
//! wire are reported through [`TransportEvent::Error`].
//!
//! # Implementations
//!
//! - [`MemoryBroker`]: in-process broker, used by tests and single-process
//!   setups
//! - [`WsBroker`] / [`WsClient`]: JSON frames over WebSocket
//!   (`websocket` feature, default)
//!
//! # Topic filters
//!
//! Subscriptions use MQTT-style filters (see [`topic_matches`]): `+` matches
//! exactly one level and a trailing `#` matches any remaining levels.

mod error;
mod memory;
mod topic;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
pub use memory::{MemoryBroker, MemoryClient};
pub use topic::{topic_matches, validate_filter};
#[cfg(feature = "websocket")]
pub use websocket::{WsBroker, WsClient};

use std::fmt;

use tokio::sync::mpsc;

/// Opaque identifier for a client attached to a broker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId(u64);

impl ClientId {
    /// Creates a new `ClientId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "client-{}", self.0)
    }
}

/// Optional credentials presented when connecting to a broker.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    /// User name, if any.
    pub username: Option<String>,
    /// Password, if any.
    pub password: Option<String>,
}

impl Credentials {
    /// Credentials with both fields set.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: Some(username.into()),
            password: Some(password.into()),
        }
    }

    /// Returns `true` when neither field is set.
    pub fn is_anonymous(&self) -> bool {
        self.username.is_none() && self.password.is_none()
    }
}

/// Something the transport reports back to its owner.
#[derive(Debug)]
pub enum TransportEvent {
    /// The connection is established and subscriptions may be (re)issued.
    Connected,
    /// The connection ended. No further messages will arrive.
    Disconnected(String),
    /// An asynchronous failure (rejected frame, broken socket, ...).
    Error(TransportError),
    /// A payload published on a topic matching one of our subscriptions.
    Message {
        /// The concrete topic the payload was published on.
        topic: String,
        /// Raw payload bytes.
        payload: Vec<u8>,
    },
}

/// Receiving side of a transport connection.
pub type EventStream = mpsc::UnboundedReceiver<TransportEvent>;

/// Outbound half of a publish/subscribe connection.
///
/// Implementations must not block: both methods enqueue work and return.
pub trait PubSub: Send + Sync + 'static {
    /// Subscribes to every topic matching `filter`.
    ///
    /// Subscribing twice to the same filter is harmless.
    fn subscribe(&self, filter: &str) -> Result<(), TransportError>;

    /// Publishes `payload` on `topic`.
    fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), TransportError>;
}
