//! Session configuration.

use parley_discovery::DiscoveryConfig;
use parley_presence::PresenceConfig;

/// Sender shown on the welcome message of the default room.
pub const WELCOME_SENDER: &str = "default-account";

/// Configuration for a chat session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Account name to start with. `None` picks a random `user <n>`.
    pub account: Option<String>,
    /// Room the session starts in. Created locally on startup.
    pub default_room: String,
    /// Message seeded into the default room, if any.
    pub welcome: Option<String>,
    /// Presence thresholds and sweep cadence.
    pub presence: PresenceConfig,
    /// Announcement cadence.
    pub discovery: DiscoveryConfig,
    /// Capacity of the command queue between handles and the actor.
    pub command_buffer: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            account: None,
            default_room: "global".to_string(),
            welcome: Some("Welcome to the chat".to_string()),
            presence: PresenceConfig::default(),
            discovery: DiscoveryConfig::default(),
            command_buffer: 64,
        }
    }
}

impl SessionConfig {
    /// Sets the starting account name.
    pub fn with_account(mut self, account: impl Into<String>) -> Self {
        self.account = Some(account.into());
        self
    }

    /// Sets the starting room.
    pub fn with_default_room(mut self, room: impl Into<String>) -> Self {
        self.default_room = room.into();
        self
    }

    /// Disables the welcome message.
    pub fn without_welcome(mut self) -> Self {
        self.welcome = None;
        self
    }
}
