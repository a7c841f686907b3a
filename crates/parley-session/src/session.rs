//! The chat session state machine.
//!
//! [`Session`] owns everything a client knows: its account, the room it is
//! in, the unsent draft, and the [`RoomStore`]. It performs no I/O. Every
//! operation updates state and returns the side effects the caller must
//! carry out, in order:
//!
//! ```text
//! command / inbound event ──→ Session ──→ Vec<Effect> ──→ transport, announcers
//! ```

use std::collections::{HashMap, VecDeque};

use parley_discovery::{Discovered, Inbound, announcement, apply_announcement, decode_inbound};
use parley_presence::{PresenceEngine, SweepReport};
use parley_protocol::{
    Account, Announcement, ChatMessage, Codec, DISCOVERY_FILTER, RoomName, Timestamp,
    discovery_topic, room_topic,
};
use parley_room::{Room, RoomError, RoomStore};
use rand::Rng;
use serde::Serialize;
use tracing::{debug, info, trace, warn};

use crate::config::WELCOME_SENDER;
use crate::{SessionConfig, SessionError};

/// A side effect requested by the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Subscribe the transport to a topic filter.
    Subscribe(String),
    /// Publish an encoded payload.
    Publish {
        /// Destination topic.
        topic: String,
        /// Encoded record.
        payload: Vec<u8>,
    },
    /// Start (or restart) the announcer for a room.
    StartAnnouncing(RoomName),
    /// Cancel the announcer for a room.
    StopAnnouncing(RoomName),
}

/// Read-only view of a session, handed to presentation code.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    /// Name the session announces and sends under.
    pub account: Account,
    /// The room the user is in.
    pub current_room: RoomName,
    /// Unsent message text.
    pub draft: String,
    /// Every known room, as of this snapshot.
    pub rooms: RoomStore,
    /// Whether the transport is connected.
    pub connected: bool,
}

impl SessionSnapshot {
    /// The current room's state.
    pub fn current(&self) -> Option<&Room> {
        self.rooms.get(self.current_room.as_str())
    }
}

/// How many sent messages are remembered for echo matching.
const ECHO_WINDOW: usize = 32;

/// Chat session state.
pub struct Session<C> {
    account: Account,
    current_room: RoomName,
    draft: String,
    rooms: RoomStore,
    connected: bool,
    presence: PresenceEngine,
    codec: C,
    /// Latest `last_seen` this session published per room and name.
    announced: HashMap<(RoomName, Account), Timestamp>,
    /// Recently published chat messages whose echo has not come back.
    unechoed: VecDeque<(RoomName, ChatMessage)>,
}

impl<C: Codec> Session<C> {
    /// Creates a session sitting in `config.default_room`.
    ///
    /// # Errors
    /// - [`SessionError::InvalidRoomName`] if the default room name is invalid
    /// - [`SessionError::EmptyAccountName`] if a blank account was configured
    pub fn new(config: &SessionConfig, codec: C, now: Timestamp) -> Result<Self, SessionError> {
        let account = match &config.account {
            Some(name) => name.clone(),
            None => format!("user {}", rand::rng().random_range(0..1000)),
        };
        let account = Account::new(account).map_err(|_| SessionError::EmptyAccountName)?;
        let current_room =
            RoomName::parse(config.default_room.clone()).map_err(SessionError::InvalidRoomName)?;

        let mut rooms = RoomStore::new();
        rooms.ensure_room(&current_room);
        if let Some(text) = &config.welcome {
            let welcome = ChatMessage {
                sender: Account::new(WELCOME_SENDER).map_err(|_| SessionError::EmptyAccountName)?,
                text: text.clone(),
            };
            // A blank welcome is simply not shown.
            let _ = rooms.append_message(&current_room, &welcome, now);
        }

        info!(%account, room = %current_room, "session created");

        Ok(Self {
            account,
            current_room,
            draft: String::new(),
            rooms,
            connected: false,
            presence: PresenceEngine::new(config.presence.clone()),
            codec,
            announced: HashMap::new(),
            unechoed: VecDeque::new(),
        })
    }

    // -- accessors ----------------------------------------------------------

    /// The local account.
    pub fn account(&self) -> &Account {
        &self.account
    }

    /// The room the user is in.
    pub fn current_room(&self) -> &RoomName {
        &self.current_room
    }

    /// Unsent message text.
    pub fn draft(&self) -> &str {
        &self.draft
    }

    /// All known rooms.
    pub fn rooms(&self) -> &RoomStore {
        &self.rooms
    }

    /// Whether the transport is connected.
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// The presence engine, for its sweep cadence.
    pub fn presence(&self) -> &PresenceEngine {
        &self.presence
    }

    /// A point-in-time view of the session. Cheap: the room store is shared.
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            account: self.account.clone(),
            current_room: self.current_room.clone(),
            draft: self.draft.clone(),
            rooms: self.rooms.clone(),
            connected: self.connected,
        }
    }

    // -- commands -----------------------------------------------------------

    /// Moves the user into `target`.
    ///
    /// Does nothing for an empty target or the current room. An unknown room
    /// is created. On success the local account leaves the outgoing room's
    /// member list at once and the draft is cleared. The new room's announcer
    /// only starts while connected; otherwise [`on_connected`](Self::on_connected)
    /// starts it.
    ///
    /// # Errors
    /// - [`SessionError::InvalidRoomName`] for a malformed name
    /// - [`SessionError::AccountNameTaken`] if `target` already lists a member
    ///   with the local account name; nothing changes
    pub fn open_room(&mut self, target: &str) -> Result<Vec<Effect>, SessionError> {
        if target.is_empty() || target == self.current_room.as_str() {
            return Ok(Vec::new());
        }
        let target = RoomName::parse(target).map_err(SessionError::InvalidRoomName)?;
        if self.rooms.has_member(target.as_str(), self.account.as_str()) {
            return Err(SessionError::AccountNameTaken {
                account: self.account.clone(),
                room: target,
            });
        }

        self.rooms.ensure_room(&target);
        self.rooms
            .remove_member(self.current_room.as_str(), self.account.as_str());
        let previous = std::mem::replace(&mut self.current_room, target.clone());
        self.draft.clear();

        info!(from = %previous, to = %target, "room opened");

        let mut effects = vec![
            Effect::Subscribe(room_topic(&target)),
            Effect::StopAnnouncing(previous),
        ];
        if self.connected {
            effects.push(Effect::StartAnnouncing(target));
        }
        Ok(effects)
    }

    /// Creates a room and moves into it.
    ///
    /// Does nothing if the room already exists.
    ///
    /// # Errors
    /// [`SessionError::InvalidRoomName`] for empty names, names containing
    /// whitespace, or topic syntax.
    pub fn add_room(&mut self, name: &str) -> Result<Vec<Effect>, SessionError> {
        let room = RoomName::parse(name).map_err(SessionError::InvalidRoomName)?;
        if self.rooms.contains(room.as_str()) {
            debug!(%room, "room already exists");
            return Ok(Vec::new());
        }
        self.rooms.ensure_room(&room);
        info!(%room, "room created");
        // A brand-new room has no members, so this cannot be refused.
        self.open_room(room.as_str())
    }

    /// Sends the draft to the current room.
    ///
    /// The message is appended locally right away; the peers get it from the
    /// publish.
    ///
    /// # Errors
    /// [`SessionError::Room`] with [`RoomError::EmptyMessage`] for a blank
    /// draft. The draft is kept and nothing is published.
    pub fn send_draft(&mut self, now: Timestamp) -> Result<Vec<Effect>, SessionError> {
        let outgoing = ChatMessage {
            sender: self.account.clone(),
            text: self.draft.clone(),
        };
        let stored = self
            .rooms
            .append_message(&self.current_room, &outgoing, now)?;
        let wire = ChatMessage {
            sender: stored.sender.clone(),
            text: stored.text.clone(),
        };
        self.draft.clear();

        let effect = self.publish(room_topic(&self.current_room), &wire);
        if effect.is_some() {
            if self.unechoed.len() == ECHO_WINDOW {
                self.unechoed.pop_front();
            }
            self.unechoed.push_back((self.current_room.clone(), wire));
        }
        Ok(effect.into_iter().collect())
    }

    /// Replaces the draft.
    pub fn change_draft(&mut self, text: impl Into<String>) {
        self.draft = text.into();
    }

    /// Renames the local account.
    ///
    /// Only later announcements and messages carry the new name. The entry
    /// under the old name leaves the current room's member list at once.
    ///
    /// # Errors
    /// - [`SessionError::EmptyAccountName`] for a blank name
    /// - [`SessionError::AccountUnchanged`] for the current name
    /// - [`SessionError::AccountNameTaken`] if the current room lists a member
    ///   with that name
    pub fn change_account_name(&mut self, name: &str) -> Result<(), SessionError> {
        let account = Account::new(name).map_err(|_| SessionError::EmptyAccountName)?;
        if account == self.account {
            return Err(SessionError::AccountUnchanged);
        }
        if self
            .rooms
            .has_member(self.current_room.as_str(), account.as_str())
        {
            return Err(SessionError::AccountNameTaken {
                account,
                room: self.current_room.clone(),
            });
        }
        info!(from = %self.account, to = %account, "account renamed");
        self.rooms
            .remove_member(self.current_room.as_str(), self.account.as_str());
        self.account = account;
        Ok(())
    }

    // -- events -------------------------------------------------------------

    /// The transport is (re)connected: subscribe to everything and announce
    /// the current room.
    pub fn on_connected(&mut self) -> Vec<Effect> {
        self.connected = true;
        let mut effects = vec![Effect::Subscribe(DISCOVERY_FILTER.to_string())];
        effects.extend(
            self.rooms
                .room_names()
                .map(|room| Effect::Subscribe(room_topic(room))),
        );
        effects.push(Effect::StartAnnouncing(self.current_room.clone()));
        effects
    }

    /// The transport dropped: stop announcing until it comes back.
    pub fn on_disconnected(&mut self) -> Vec<Effect> {
        self.connected = false;
        vec![Effect::StopAnnouncing(self.current_room.clone())]
    }

    /// Decodes and applies a raw transport message. Undecodable traffic is
    /// dropped.
    pub fn on_message(&mut self, topic: &str, payload: &[u8], now: Timestamp) -> Vec<Effect> {
        match decode_inbound(topic, payload, &self.codec) {
            Ok(inbound) => self.on_inbound(inbound, now),
            Err(e) => {
                debug!(%topic, error = %e, "dropping undecodable message");
                Vec::new()
            }
        }
    }

    /// Applies a decoded message.
    ///
    /// Echoes of this session's own chat are dropped, including ones sent
    /// under a previous name. Its own announcements are dropped once they no
    /// longer describe where and who it is, so a late echo cannot put it
    /// back into a room it left.
    pub fn on_inbound(&mut self, inbound: Inbound, now: Timestamp) -> Vec<Effect> {
        if let Inbound::Message { room, message } = &inbound {
            if self.take_echo(room, message) || inbound.is_chat_from(&self.account) {
                return Vec::new();
            }
        }
        match inbound {
            Inbound::Announcement(ann) => {
                if self.is_stale_own_announcement(&ann) {
                    trace!(
                        room = %ann.room,
                        account = %ann.account,
                        "dropping stale own announcement"
                    );
                    return Vec::new();
                }
                match apply_announcement(&mut self.rooms, &ann) {
                    Discovered::RoomDiscovered(room) => {
                        vec![Effect::Subscribe(room_topic(&room))]
                    }
                    Discovered::MemberUpdated(_) => Vec::new(),
                }
            }
            Inbound::Message { room, message } => {
                self.rooms.ensure_room(&room);
                match self.rooms.append_message(&room, &message, now) {
                    Ok(_) => {}
                    Err(RoomError::EmptyMessage(_)) => {
                        debug!(%room, sender = %message.sender, "dropping blank message");
                    }
                    Err(e) => {
                        debug!(%room, error = %e, "dropping message");
                    }
                }
                Vec::new()
            }
        }
    }

    /// Builds the announcement for `room` under the current account.
    pub fn on_announce_due(&mut self, room: &RoomName, now: Timestamp) -> Vec<Effect> {
        let ann = announcement(&self.account, room, now);
        let effect = self.publish(discovery_topic(room), &ann);
        if effect.is_some() {
            self.announced.insert((ann.room, ann.account), ann.last_seen);
        }
        effect.into_iter().collect()
    }

    /// Runs the presence sweep.
    pub fn on_sweep(&mut self, now: Timestamp) -> SweepReport {
        self.presence.sweep(&mut self.rooms, now)
    }

    fn take_echo(&mut self, room: &RoomName, message: &ChatMessage) -> bool {
        let Some(index) = self
            .unechoed
            .iter()
            .position(|(sent_to, sent)| sent_to == room && sent == message)
        else {
            return false;
        };
        self.unechoed.remove(index);
        true
    }

    /// An announcement this session published that no longer matches its
    /// current account and room.
    fn is_stale_own_announcement(&self, ann: &Announcement) -> bool {
        let key = (ann.room.clone(), ann.account.clone());
        let Some(published) = self.announced.get(&key) else {
            return false;
        };
        let current = ann.account == self.account && ann.room == self.current_room;
        ann.last_seen <= *published && !current
    }

    fn publish<T: Serialize>(&self, topic: String, record: &T) -> Option<Effect> {
        match self.codec.encode(record) {
            Ok(payload) => Some(Effect::Publish { topic, payload }),
            Err(e) => {
                warn!(%topic, error = %e, "failed to encode outgoing record");
                None
            }
        }
    }
}
