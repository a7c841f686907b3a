//! Identity newtypes and the records that travel on the wire.

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{ProtocolError, Timestamp};

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// A self-asserted display name.
///
/// Nothing guarantees global uniqueness: two peers may pick the same name.
/// The only rule enforced here is that the name is not blank.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Account(String);

impl Account {
    /// Validates and wraps a display name.
    pub fn new(name: impl Into<String>) -> Result<Self, ProtocolError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ProtocolError::InvalidAccount);
        }
        Ok(Self(name))
    }

    /// The name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Account {
    type Error = ProtocolError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Account> for String {
    fn from(account: Account) -> String {
        account.0
    }
}

impl Borrow<str> for Account {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A room name.
///
/// Room names are embedded in topics, so besides being non-empty and free
/// of whitespace they may not contain the level separator `/` or the
/// filter wildcards `+` and `#`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RoomName(String);

impl RoomName {
    /// Validates and wraps a room name.
    pub fn parse(name: impl Into<String>) -> Result<Self, ProtocolError> {
        let name = name.into();
        let forbidden = |c: char| c.is_whitespace() || matches!(c, '/' | '+' | '#');
        if name.is_empty() || name.contains(forbidden) {
            return Err(ProtocolError::InvalidRoomName(name));
        }
        Ok(Self(name))
    }

    /// The name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for RoomName {
    type Error = ProtocolError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<RoomName> for String {
    fn from(room: RoomName) -> String {
        room.0
    }
}

impl Borrow<str> for RoomName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Wire records
// ---------------------------------------------------------------------------

/// Periodic proof that `account` is alive and sitting in `room`.
///
/// Published on `room/<room>/discovery`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Announcement {
    /// Who is announcing.
    pub account: Account,
    /// The room being announced.
    pub room: RoomName,
    /// The announcer's clock at publish time.
    pub last_seen: Timestamp,
    /// Always `true` from well-behaved peers.
    pub online: bool,
}

/// A chat line as published on `room/<room>`.
///
/// There is no timestamp: receivers stamp messages with their own clock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Author of the message.
    pub sender: Account,
    /// Message body.
    pub text: String,
}
