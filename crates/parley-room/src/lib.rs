//! The room store.
//!
//! Every client keeps its own picture of which rooms exist, what was said in
//! them, and who is in them. This crate holds that picture and the rules for
//! changing it; it does no I/O and knows nothing about timers.
//!
//! # Key types
//!
//! - [`RoomStore`]: all known rooms, keyed by [`RoomName`](parley_protocol::RoomName)
//! - [`Room`]: one room's message log and member table
//! - [`Message`] / [`MemberInfo`]: entries of those two collections
//!
//! # Snapshots
//!
//! Every collection sits behind an `Arc` and is written through
//! `Arc::make_mut`. Cloning a store or a room is a handful of reference
//! count bumps, and a clone never observes later writes.

mod error;
mod room;
mod store;

pub use error::RoomError;
pub use room::{MemberInfo, Message, Room};
pub use store::{RoomStore, Upsert};
