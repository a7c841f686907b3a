//! Integration tests for inbound decoding and announcement application.

use parley_discovery::{Discovered, Inbound, announcement, apply_announcement, decode_inbound};
use parley_protocol::{
    Account, ChatMessage, Codec, JsonCodec, ProtocolError, RoomName, Timestamp, discovery_topic,
    room_topic,
};
use parley_room::{MemberInfo, RoomStore, Upsert};

fn room(name: &str) -> RoomName {
    RoomName::parse(name).unwrap()
}

fn account(name: &str) -> Account {
    Account::new(name).unwrap()
}

// =========================================================================
// decode_inbound
// =========================================================================

#[test]
fn test_decode_announcement_from_discovery_topic() {
    let payload =
        br#"{"account":"user 42","room":"lobby","last_seen":1700000000000,"online":true}"#;
    let inbound = decode_inbound(&discovery_topic(&room("lobby")), payload, &JsonCodec).unwrap();

    assert_eq!(
        inbound,
        Inbound::Announcement(announcement(
            &account("user 42"),
            &room("lobby"),
            Timestamp::from_millis(1_700_000_000_000),
        ))
    );
}

#[test]
fn test_decode_chat_takes_room_from_topic() {
    let payload = br#"{"sender":"B","text":"hello"}"#;
    let inbound = decode_inbound(&room_topic(&room("lobby")), payload, &JsonCodec).unwrap();

    assert_eq!(
        inbound,
        Inbound::Message {
            room: room("lobby"),
            message: ChatMessage {
                sender: account("B"),
                text: "hello".into(),
            },
        }
    );
}

#[test]
fn test_decode_malformed_payload_is_decode_error() {
    let result = decode_inbound("room/lobby", b"not json", &JsonCodec);
    assert!(matches!(result, Err(ProtocolError::Decode(_))));

    let missing_field = decode_inbound("room/lobby/discovery", br#"{"account":"A"}"#, &JsonCodec);
    assert!(matches!(missing_field, Err(ProtocolError::Decode(_))));
}

#[test]
fn test_decode_round_trips_encoded_announcement() {
    let sent = announcement(&account("A"), &room("lobby"), Timestamp::from_millis(5));
    let bytes = JsonCodec.encode(&sent).unwrap();

    let inbound = decode_inbound("room/lobby/discovery", &bytes, &JsonCodec).unwrap();
    assert_eq!(inbound, Inbound::Announcement(sent));
}

// =========================================================================
// apply_announcement
// =========================================================================

#[test]
fn test_announcement_for_unknown_room_creates_empty_room() {
    let mut store = RoomStore::new();
    let ann = announcement(&account("B"), &room("lobby"), Timestamp::from_millis(1));

    let outcome = apply_announcement(&mut store, &ann);

    assert_eq!(outcome, Discovered::RoomDiscovered(room("lobby")));
    assert_eq!(store.len(), 1);
    let lobby = store.get("lobby").unwrap();
    assert!(lobby.members().is_empty(), "the announcer is not added yet");
    assert!(lobby.messages().is_empty());
}

#[test]
fn test_second_announcement_adds_the_member() {
    let mut store = RoomStore::new();
    let ann = announcement(&account("B"), &room("lobby"), Timestamp::from_millis(1));

    apply_announcement(&mut store, &ann);
    let outcome = apply_announcement(&mut store, &ann);

    assert_eq!(outcome, Discovered::MemberUpdated(Upsert::Inserted));
    assert_eq!(
        store.get("lobby").unwrap().member("B"),
        Some(&MemberInfo {
            account: account("B"),
            last_seen: Timestamp::from_millis(1),
            online: true,
        })
    );
}

#[test]
fn test_announcement_for_known_room_touches_one_member_only() {
    let mut store = RoomStore::new();
    store.ensure_room(&room("lobby"));
    store.ensure_room(&room("global"));
    store
        .append_message(
            &room("lobby"),
            &ChatMessage {
                sender: account("A"),
                text: "hi".into(),
            },
            Timestamp::from_millis(1),
        )
        .unwrap();
    apply_announcement(
        &mut store,
        &announcement(&account("A"), &room("lobby"), Timestamp::from_millis(1)),
    );
    let before = store.clone();

    let outcome = apply_announcement(
        &mut store,
        &announcement(&account("B"), &room("lobby"), Timestamp::from_millis(2)),
    );

    assert_eq!(outcome, Discovered::MemberUpdated(Upsert::Inserted));
    let (old, new) = (before.get("lobby").unwrap(), store.get("lobby").unwrap());
    assert_eq!(new.members().len(), old.members().len() + 1);
    assert_eq!(new.member("A"), old.member("A"));
    assert!(new.shares_log_with(old), "messages untouched");
    assert_eq!(store.get("global"), before.get("global"));
}

#[test]
fn test_repeated_announcement_refreshes_last_seen() {
    let mut store = RoomStore::new();
    store.ensure_room(&room("lobby"));

    apply_announcement(
        &mut store,
        &announcement(&account("B"), &room("lobby"), Timestamp::from_millis(1)),
    );
    let outcome = apply_announcement(
        &mut store,
        &announcement(&account("B"), &room("lobby"), Timestamp::from_millis(501)),
    );

    assert_eq!(outcome, Discovered::MemberUpdated(Upsert::Updated));
    let b = store.get("lobby").unwrap().member("B").unwrap();
    assert_eq!(b.last_seen, Timestamp::from_millis(501));
}
