//! In-process broker.
//!
//! Every client gets its own unbounded event channel. Publishing walks the
//! registry and delivers one copy per client with at least one matching
//! filter, the publisher included (like an MQTT broker without `no_local`).

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::{
    ClientId, EventStream, PubSub, TransportError, TransportEvent, topic_matches, validate_filter,
};

struct Subscriber {
    filters: Vec<String>,
    events: mpsc::UnboundedSender<TransportEvent>,
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    clients: HashMap<ClientId, Subscriber>,
}

/// An in-process publish/subscribe broker.
///
/// Cheap to clone; all clones share one registry.
#[derive(Clone, Default)]
pub struct MemoryBroker {
    registry: Arc<Mutex<Registry>>,
}

impl MemoryBroker {
    /// Creates an empty broker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches a new client.
    ///
    /// The returned stream already holds [`TransportEvent::Connected`].
    pub fn connect(&self) -> (MemoryClient, EventStream) {
        let (tx, rx) = mpsc::unbounded_channel();
        let _ = tx.send(TransportEvent::Connected);

        let mut registry = self.registry.lock();
        registry.next_id += 1;
        let id = ClientId::new(registry.next_id);
        registry.clients.insert(
            id,
            Subscriber {
                filters: Vec::new(),
                events: tx,
            },
        );
        drop(registry);

        tracing::debug!(%id, "memory client connected");
        (
            MemoryClient {
                id,
                broker: self.clone(),
            },
            rx,
        )
    }

    /// Forcibly detaches a client, as if its connection dropped.
    ///
    /// The client receives [`TransportEvent::Disconnected`] and every later
    /// operation on its handle fails with [`TransportError::Shutdown`].
    pub fn disconnect(&self, id: ClientId) {
        if let Some(sub) = self.registry.lock().clients.remove(&id) {
            let _ = sub
                .events
                .send(TransportEvent::Disconnected("disconnected by broker".into()));
            tracing::debug!(%id, "memory client disconnected");
        }
    }

    /// Publishes raw bytes on `topic` on behalf of no particular client.
    ///
    /// Returns how many clients the payload was delivered to.
    pub fn publish(&self, topic: &str, payload: Vec<u8>) -> usize {
        let mut registry = self.registry.lock();
        let mut delivered = 0;
        let mut gone = Vec::new();

        for (id, sub) in &registry.clients {
            if !sub.filters.iter().any(|f| topic_matches(f, topic)) {
                continue;
            }
            let event = TransportEvent::Message {
                topic: topic.to_string(),
                payload: payload.clone(),
            };
            if sub.events.send(event).is_ok() {
                delivered += 1;
            } else {
                gone.push(*id);
            }
        }

        for id in gone {
            registry.clients.remove(&id);
        }

        tracing::trace!(topic, delivered, "memory broker delivered payload");
        delivered
    }

    /// Number of attached clients.
    pub fn client_count(&self) -> usize {
        self.registry.lock().clients.len()
    }
}

/// A client handle attached to a [`MemoryBroker`].
///
/// Dropping the handle detaches the client.
pub struct MemoryClient {
    id: ClientId,
    broker: MemoryBroker,
}

impl MemoryClient {
    /// This client's identifier on the broker.
    pub fn id(&self) -> ClientId {
        self.id
    }
}

impl PubSub for MemoryClient {
    fn subscribe(&self, filter: &str) -> Result<(), TransportError> {
        validate_filter(filter)?;
        let mut registry = self.broker.registry.lock();
        let sub = registry
            .clients
            .get_mut(&self.id)
            .ok_or(TransportError::Shutdown)?;
        if !sub.filters.iter().any(|f| f == filter) {
            sub.filters.push(filter.to_string());
            tracing::debug!(id = %self.id, filter, "subscribed");
        }
        Ok(())
    }

    fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), TransportError> {
        if !self.broker.registry.lock().clients.contains_key(&self.id) {
            return Err(TransportError::Shutdown);
        }
        self.broker.publish(topic, payload);
        Ok(())
    }
}

impl Drop for MemoryClient {
    fn drop(&mut self) {
        self.broker.registry.lock().clients.remove(&self.id);
    }
}
