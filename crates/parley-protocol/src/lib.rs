//! Wire protocol for Parley.
//!
//! - **Identity** ([`Account`], [`RoomName`]): validated newtypes.
//! - **Wire records** ([`Announcement`], [`ChatMessage`]): the JSON
//!   payloads peers exchange. Field names are a cross-peer contract.
//! - **Topics** ([`room_topic`], [`discovery_topic`], [`Topic`]): where
//!   those payloads travel.
//! - **Time** ([`Timestamp`], [`Clock`]): wall-clock milliseconds, the unit
//!   of the `last_seen` field.
//! - **Codec** ([`Codec`], [`JsonCodec`]): bytes in, records out.
//!
//! ```text
//! Transport (bytes on topics) → Protocol (records) → Room store / Session
//! ```

mod codec;
mod error;
mod time;
mod topic;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use time::{Clock, SystemClock, Timestamp};
pub use topic::{DISCOVERY_FILTER, ROOM_PREFIX, Topic, discovery_topic, room_topic};
pub use types::{Account, Announcement, ChatMessage, RoomName};
