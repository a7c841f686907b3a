//! The set of known rooms.

use std::collections::btree_map::{self, BTreeMap};
use std::collections::hash_map::Entry;
use std::sync::Arc;

use parley_protocol::{ChatMessage, RoomName, Timestamp};

use crate::{MemberInfo, Message, Room, RoomError};

/// Outcome of [`RoomStore::upsert_member`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    /// The member was not listed before.
    Inserted,
    /// An existing entry was refreshed.
    Updated,
}

/// All rooms this client knows about.
///
/// Rooms are created lazily and never removed. Cloning is O(1); the clone
/// is an independent snapshot.
#[derive(Debug, Clone, Default)]
pub struct RoomStore {
    rooms: Arc<BTreeMap<RoomName, Room>>,
}

impl RoomStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the room called `name`, creating an empty one first if
    /// necessary.
    pub fn ensure_room(&mut self, name: &RoomName) -> &Room {
        if !self.rooms.contains_key(name) {
            tracing::debug!(room = %name, "creating room entry");
        }
        Arc::make_mut(&mut self.rooms)
            .entry(name.clone())
            .or_default()
    }

    /// Returns an independent copy of a room, or `None` if it doesn't
    /// exist.
    ///
    /// The copy shares storage with the store until either side changes,
    /// so this does not copy the message history.
    pub fn clone_room(&self, name: &str) -> Option<Room> {
        self.rooms.get(name).cloned()
    }

    /// Appends a chat line to `room`.
    ///
    /// The text is trimmed and stamped with `received_at`, never with a
    /// time claimed by the sender. Returns the stored message.
    ///
    /// # Errors
    /// - [`RoomError::EmptyMessage`] if the text is blank; nothing changes
    /// - [`RoomError::NotFound`] if the room doesn't exist
    pub fn append_message(
        &mut self,
        room: &RoomName,
        message: &ChatMessage,
        received_at: Timestamp,
    ) -> Result<&Message, RoomError> {
        let text = message.text.trim();
        if text.is_empty() {
            return Err(RoomError::EmptyMessage(room.clone()));
        }
        let entry = self.room_mut(room)?;
        let log = Arc::make_mut(&mut entry.messages);
        log.push(Message {
            text: text.to_string(),
            sender: message.sender.clone(),
            time: received_at,
        });
        Ok(&log[log.len() - 1])
    }

    /// Inserts or refreshes a member entry.
    ///
    /// Re-applying the same announcement is not treated as a duplicate: the
    /// entry is simply written again. The message log is untouched.
    ///
    /// # Errors
    /// [`RoomError::NotFound`] if the room doesn't exist.
    pub fn upsert_member(
        &mut self,
        room: &RoomName,
        info: MemberInfo,
    ) -> Result<Upsert, RoomError> {
        let entry = self.room_mut(room)?;
        let members = Arc::make_mut(&mut entry.members);
        match members.entry(info.account.clone()) {
            Entry::Occupied(mut slot) => {
                let member = slot.get_mut();
                member.last_seen = info.last_seen;
                member.online = info.online;
                Ok(Upsert::Updated)
            }
            Entry::Vacant(slot) => {
                slot.insert(info);
                Ok(Upsert::Inserted)
            }
        }
    }

    /// Removes a member from a room, returning its last entry.
    ///
    /// Nothing is written (and no copy is made) if the member isn't listed.
    pub fn remove_member(&mut self, room: &str, account: &str) -> Option<MemberInfo> {
        if !self.has_member(room, account) {
            return None;
        }
        let entry = Arc::make_mut(&mut self.rooms).get_mut(room)?;
        Arc::make_mut(&mut entry.members).remove(account)
    }

    /// Sets a member's online flag. Returns `true` if the flag changed.
    ///
    /// Nothing is written when the flag already has that value.
    pub fn set_online(&mut self, room: &str, account: &str, online: bool) -> bool {
        let current = self
            .rooms
            .get(room)
            .and_then(|r| r.member(account))
            .map(|m| m.online);
        if current != Some(!online) {
            return false;
        }
        let changed = Arc::make_mut(&mut self.rooms)
            .get_mut(room)
            .and_then(|r| Arc::make_mut(&mut r.members).get_mut(account))
            .map(|m| m.online = online);
        changed.is_some()
    }

    /// Whether a room called `name` exists.
    pub fn contains(&self, name: &str) -> bool {
        self.rooms.contains_key(name)
    }

    /// Borrows a room.
    pub fn get(&self, name: &str) -> Option<&Room> {
        self.rooms.get(name)
    }

    /// Whether `account` is listed in `room`. `false` for unknown rooms.
    pub fn has_member(&self, room: &str, account: &str) -> bool {
        self.rooms.get(room).is_some_and(|r| r.has_member(account))
    }

    /// Room names in sorted order.
    pub fn room_names(&self) -> impl Iterator<Item = &RoomName> {
        self.rooms.keys()
    }

    /// All rooms in name order.
    pub fn iter(&self) -> btree_map::Iter<'_, RoomName, Room> {
        self.rooms.iter()
    }

    /// Number of rooms.
    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    /// Returns `true` if no room exists.
    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    fn room_mut(&mut self, room: &RoomName) -> Result<&mut Room, RoomError> {
        if !self.rooms.contains_key(room) {
            return Err(RoomError::NotFound(room.clone()));
        }
        Arc::make_mut(&mut self.rooms)
            .get_mut(room)
            .ok_or_else(|| RoomError::NotFound(room.clone()))
    }
}

impl<'a> IntoIterator for &'a RoomStore {
    type Item = (&'a RoomName, &'a Room);
    type IntoIter = btree_map::Iter<'a, RoomName, Room>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
