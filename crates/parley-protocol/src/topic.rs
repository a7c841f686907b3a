//! Topic naming.
//!
//! Chat messages for room `lobby` travel on `room/lobby`; discovery
//! announcements on `room/lobby/discovery`. Every client subscribes to
//! [`DISCOVERY_FILTER`] so it hears announcements for rooms it has never
//! seen, which is how rooms spread between peers.

use crate::RoomName;

/// Namespace shared by every chat topic.
pub const ROOM_PREFIX: &str = "room/";

/// Suffix of discovery topics.
const DISCOVERY_SUFFIX: &str = "/discovery";

/// Subscription filter matching every room's discovery topic.
pub const DISCOVERY_FILTER: &str = "room/+/discovery";

/// Topic carrying chat messages for `room`.
pub fn room_topic(room: &RoomName) -> String {
    format!("{ROOM_PREFIX}{room}")
}

/// Topic carrying discovery announcements for `room`.
pub fn discovery_topic(room: &RoomName) -> String {
    format!("{ROOM_PREFIX}{room}{DISCOVERY_SUFFIX}")
}

/// A parsed topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Topic {
    /// `room/<name>`
    Chat(RoomName),
    /// `room/<name>/discovery`
    Discovery(RoomName),
}

impl Topic {
    /// Parses a concrete topic. Returns `None` for anything outside the
    /// chat namespace or with an invalid room segment.
    pub fn parse(topic: &str) -> Option<Topic> {
        let rest = topic.strip_prefix(ROOM_PREFIX)?;
        match rest.strip_suffix(DISCOVERY_SUFFIX) {
            Some(room) => RoomName::parse(room).ok().map(Topic::Discovery),
            None => RoomName::parse(rest).ok().map(Topic::Chat),
        }
    }

    /// The room this topic belongs to.
    pub fn room(&self) -> &RoomName {
        match self {
            Topic::Chat(room) | Topic::Discovery(room) => room,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn room(name: &str) -> RoomName {
        RoomName::parse(name).unwrap()
    }

    #[test]
    fn test_topic_builders() {
        assert_eq!(room_topic(&room("lobby")), "room/lobby");
        assert_eq!(discovery_topic(&room("lobby")), "room/lobby/discovery");
    }

    #[test]
    fn test_parse_chat_and_discovery() {
        assert_eq!(Topic::parse("room/lobby"), Some(Topic::Chat(room("lobby"))));
        assert_eq!(
            Topic::parse("room/lobby/discovery"),
            Some(Topic::Discovery(room("lobby")))
        );
    }

    #[test]
    fn test_parse_rejects_foreign_and_malformed_topics() {
        assert_eq!(Topic::parse("lobby"), None);
        assert_eq!(Topic::parse("room/"), None);
        assert_eq!(Topic::parse("room/a/b"), None);
        assert_eq!(Topic::parse("room//discovery"), None);
    }

    #[test]
    fn test_room_named_discovery_is_still_chat() {
        assert_eq!(
            Topic::parse("room/discovery"),
            Some(Topic::Chat(room("discovery")))
        );
    }
}
