//! Classification of inbound traffic and application of announcements.

use parley_protocol::{
    Account, Announcement, ChatMessage, Codec, ProtocolError, RoomName, Timestamp, Topic,
};
use parley_room::{MemberInfo, RoomStore, Upsert};
use tracing::{debug, info};

/// A decoded message from the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// Someone announced presence in a room.
    Announcement(Announcement),
    /// A chat line published on a room's chat topic.
    Message {
        /// Room taken from the topic.
        room: RoomName,
        /// The decoded payload.
        message: ChatMessage,
    },
}

impl Inbound {
    /// Whether this is a chat line sent by `account`.
    pub fn is_chat_from(&self, account: &Account) -> bool {
        matches!(self, Inbound::Message { message, .. } if message.sender == *account)
    }
}

/// Decodes one transport message.
///
/// The topic decides the payload type: `room/<room>/discovery` carries an
/// [`Announcement`], `room/<room>` a [`ChatMessage`].
///
/// # Errors
/// - [`ProtocolError::InvalidMessage`] for topics outside the chat namespace
/// - whatever the codec reports for a payload that doesn't decode
pub fn decode_inbound<C: Codec>(
    topic: &str,
    payload: &[u8],
    codec: &C,
) -> Result<Inbound, ProtocolError> {
    match Topic::parse(topic) {
        Some(Topic::Discovery(_)) => codec.decode(payload).map(Inbound::Announcement),
        Some(Topic::Chat(room)) => {
            let message = codec.decode(payload)?;
            Ok(Inbound::Message { room, message })
        }
        None => Err(ProtocolError::InvalidMessage(format!(
            "unexpected topic {topic:?}"
        ))),
    }
}

/// What [`apply_announcement`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Discovered {
    /// The room was unknown and has been created empty. The caller should
    /// subscribe to its chat topic.
    RoomDiscovered(RoomName),
    /// The room was known; the announcer's entry was inserted or refreshed.
    MemberUpdated(Upsert),
}

/// Folds an announcement into the store.
///
/// For a known room the announcer is upserted as a member. For an unknown
/// room only the room is created; the announcer shows up as a member with
/// its next announcement.
pub fn apply_announcement(store: &mut RoomStore, announcement: &Announcement) -> Discovered {
    let room = &announcement.room;
    // `upsert_member` only fails for unknown rooms.
    match store.upsert_member(room, MemberInfo::from(announcement)) {
        Ok(upsert) => {
            if upsert == Upsert::Inserted {
                debug!(%room, account = %announcement.account, "member joined");
            }
            Discovered::MemberUpdated(upsert)
        }
        Err(_) => {
            store.ensure_room(room);
            info!(%room, by = %announcement.account, "room discovered");
            Discovered::RoomDiscovered(room.clone())
        }
    }
}

/// Builds the announcement `account` publishes for `room` at `now`.
pub fn announcement(account: &Account, room: &RoomName, now: Timestamp) -> Announcement {
    Announcement {
        account: account.clone(),
        room: room.clone(),
        last_seen: now,
        online: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_protocol::JsonCodec;

    #[test]
    fn test_decode_rejects_foreign_topic() {
        let result = decode_inbound("news/today", b"{}", &JsonCodec);
        assert!(matches!(result, Err(ProtocolError::InvalidMessage(_))));
    }

    #[test]
    fn test_decode_rejects_invalid_room_segment() {
        let result = decode_inbound("room/a b", br#"{"sender":"A","text":"hi"}"#, &JsonCodec);
        assert!(matches!(result, Err(ProtocolError::InvalidMessage(_))));
    }

    #[test]
    fn test_is_chat_from() {
        let me = Account::new("me").unwrap();
        let inbound = Inbound::Message {
            room: RoomName::parse("lobby").unwrap(),
            message: ChatMessage {
                sender: me.clone(),
                text: "hi".into(),
            },
        };
        assert!(inbound.is_chat_from(&me));
        assert!(!inbound.is_chat_from(&Account::new("other").unwrap()));

        let ann = Inbound::Announcement(announcement(
            &me,
            &RoomName::parse("lobby").unwrap(),
            Timestamp::EPOCH,
        ));
        assert!(!ann.is_chat_from(&me), "announcements are never echoes");
    }
}
