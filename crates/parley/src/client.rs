//! Client builder: wires a transport to a session actor.

use std::sync::Arc;

use parley_protocol::{Clock, JsonCodec, SystemClock};
use parley_session::{SessionConfig, SessionHandle, spawn_session};
use parley_transport::{Credentials, MemoryBroker, WsClient};

use crate::{ClientConfig, ParleyError};

/// Builder for a chat client.
///
/// # Example
///
/// ```rust,no_run
/// use parley::prelude::*;
///
/// # async fn run() -> Result<(), ParleyError> {
/// let config = ClientConfig::from_env()?;
/// let chat = ClientBuilder::new().connect(&config).await?;
/// chat.change_draft("hello").await?;
/// chat.send_draft().await?;
/// # Ok(())
/// # }
/// ```
pub struct ClientBuilder {
    session: SessionConfig,
    clock: Arc<dyn Clock>,
}

impl ClientBuilder {
    /// A builder with default session settings and the system clock.
    pub fn new() -> Self {
        Self {
            session: SessionConfig::default(),
            clock: Arc::new(SystemClock),
        }
    }

    /// Replaces the session configuration.
    pub fn session_config(mut self, config: SessionConfig) -> Self {
        self.session = config;
        self
    }

    /// Sets the starting account name.
    pub fn account(mut self, account: impl Into<String>) -> Self {
        self.session.account = Some(account.into());
        self
    }

    /// Replaces the clock used to stamp messages and age members.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Attaches to an in-process broker.
    pub fn connect_memory(self, broker: &MemoryBroker) -> Result<SessionHandle, ParleyError> {
        let (client, events) = broker.connect();
        tracing::debug!(client = %client.id(), "attached to in-process broker");
        let handle = spawn_session(self.session, client, events, JsonCodec, self.clock)?;
        Ok(handle)
    }

    /// Dials a WebSocket broker.
    pub async fn connect_websocket(
        self,
        url: &str,
        credentials: Credentials,
    ) -> Result<SessionHandle, ParleyError> {
        let (client, events) = WsClient::connect(url, credentials).await?;
        let handle = spawn_session(self.session, client, events, JsonCodec, self.clock)?;
        Ok(handle)
    }

    /// Dials the broker described by `config`. The config's account, if
    /// set, overrides the builder's.
    ///
    /// # Errors
    /// [`ParleyError::Config`] if `config` names no broker.
    pub async fn connect(mut self, config: &ClientConfig) -> Result<SessionHandle, ParleyError> {
        let url = config
            .websocket_url()
            .ok_or_else(|| ParleyError::Config("no broker URL configured".into()))?;
        if let Some(account) = &config.account {
            self.session.account = Some(account.clone());
        }
        self.connect_websocket(&url, config.credentials.clone()).await
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
