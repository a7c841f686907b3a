//! A single room: message log and member table.

use std::collections::HashMap;
use std::sync::Arc;

use parley_protocol::{Account, Announcement, Timestamp};
use serde::{Deserialize, Serialize};

/// One accepted chat line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Trimmed, never empty.
    pub text: String,
    /// Author as claimed by the payload.
    pub sender: Account,
    /// When *this* client accepted the message.
    pub time: Timestamp,
}

/// Liveness record of one member of a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberInfo {
    /// The member's account.
    pub account: Account,
    /// Timestamp of the member's latest announcement.
    pub last_seen: Timestamp,
    /// Result of the latest presence classification.
    pub online: bool,
}

impl From<&Announcement> for MemberInfo {
    fn from(announcement: &Announcement) -> Self {
        Self {
            account: announcement.account.clone(),
            last_seen: announcement.last_seen,
            online: announcement.online,
        }
    }
}

/// A room's state.
///
/// Cheap to clone: the log and the member table are shared until one side
/// writes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Room {
    pub(crate) messages: Arc<Vec<Message>>,
    pub(crate) members: Arc<HashMap<Account, MemberInfo>>,
}

impl Room {
    /// Messages in the order they were accepted.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// The most recent message, if any.
    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// All members, in no particular order.
    pub fn members(&self) -> &HashMap<Account, MemberInfo> {
        &self.members
    }

    /// Looks up one member.
    pub fn member(&self, account: &str) -> Option<&MemberInfo> {
        self.members.get(account)
    }

    /// Whether `account` is listed in this room.
    pub fn has_member(&self, account: &str) -> bool {
        self.members.contains_key(account)
    }

    /// Members currently classified online, sorted by account.
    pub fn online_members(&self) -> Vec<&Account> {
        let mut online: Vec<&Account> = self
            .members
            .values()
            .filter(|m| m.online)
            .map(|m| &m.account)
            .collect();
        online.sort();
        online
    }

    /// Returns `true` if both rooms still share the same message log
    /// allocation, i.e. neither has appended since one was cloned from the
    /// other.
    pub fn shares_log_with(&self, other: &Room) -> bool {
        Arc::ptr_eq(&self.messages, &other.messages)
    }
}
