//! Environment-driven client configuration.

use parley_session::SessionConfig;
use parley_transport::Credentials;

use crate::ParleyError;

/// Broker host, optionally with a `ws://` scheme.
pub const ENV_BROKER_URL: &str = "PARLEY_BROKER_URL";
/// Broker port.
pub const ENV_BROKER_PORT: &str = "PARLEY_BROKER_PORT";
/// WebSocket path on the broker, e.g. `/mqtt`.
pub const ENV_BROKER_PATH: &str = "PARLEY_BROKER_PATH";
/// Broker user name. Only used together with the password.
pub const ENV_USERNAME: &str = "PARLEY_USERNAME";
/// Broker password. Only used together with the user name.
pub const ENV_PASSWORD: &str = "PARLEY_PASSWORD";
/// Starting account name.
pub const ENV_ACCOUNT: &str = "PARLEY_ACCOUNT";

/// Where and how a client connects.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientConfig {
    /// Broker host (or full `ws://` URL without port).
    pub broker_url: Option<String>,
    /// Broker port.
    pub broker_port: Option<u16>,
    /// Path appended to the URL.
    pub broker_path: Option<String>,
    /// Broker credentials; anonymous unless both parts were given.
    pub credentials: Credentials,
    /// Starting account name. `None` picks a random one.
    pub account: Option<String>,
}

impl ClientConfig {
    /// Reads the `PARLEY_*` environment variables. Unset and empty
    /// variables count as absent.
    ///
    /// # Errors
    /// [`ParleyError::Config`] if the port is not a number.
    pub fn from_env() -> Result<Self, ParleyError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env), reading through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ParleyError> {
        let get = |key: &str| lookup(key).filter(|value| !value.is_empty());

        let broker_port = match get(ENV_BROKER_PORT) {
            Some(port) => Some(port.trim().parse::<u16>().map_err(|_| {
                ParleyError::Config(format!(
                    "{ENV_BROKER_PORT} must be a port number, got {port:?}"
                ))
            })?),
            None => None,
        };

        let credentials = match (get(ENV_USERNAME), get(ENV_PASSWORD)) {
            (Some(username), Some(password)) => Credentials::new(username, password),
            (Some(_), None) | (None, Some(_)) => {
                tracing::warn!("only one of username/password set, connecting anonymously");
                Credentials::default()
            }
            (None, None) => Credentials::default(),
        };

        Ok(Self {
            broker_url: get(ENV_BROKER_URL),
            broker_port,
            broker_path: get(ENV_BROKER_PATH),
            credentials,
            account: get(ENV_ACCOUNT),
        })
    }

    /// The WebSocket URL to dial, or `None` if no broker is configured.
    ///
    /// `example.org`, port `8080` and path `mqtt` give
    /// `ws://example.org:8080/mqtt`.
    pub fn websocket_url(&self) -> Option<String> {
        let base = self.broker_url.as_deref()?.trim_end_matches('/');
        let mut url = if base.starts_with("ws://") || base.starts_with("wss://") {
            base.to_string()
        } else {
            format!("ws://{base}")
        };
        if let Some(port) = self.broker_port {
            url.push_str(&format!(":{port}"));
        }
        if let Some(path) = &self.broker_path {
            if !path.starts_with('/') {
                url.push('/');
            }
            url.push_str(path);
        }
        Some(url)
    }

    /// A session config using this client's account.
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            account: self.account.clone(),
            ..SessionConfig::default()
        }
    }
}
