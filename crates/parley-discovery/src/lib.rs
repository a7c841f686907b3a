//! Discovery protocol for Parley.
//!
//! Rooms and members are learned purely from traffic. While a client sits in
//! a room it announces itself on `room/<room>/discovery` every
//! [`DiscoveryConfig::announce_interval`]; every client listens on
//! `room/+/discovery` and records what it hears.
//!
//! This crate has two halves:
//!
//! - **Outbound**: [`AnnouncerSet`] owns one timer task per announced room.
//!   A task never publishes itself; it enqueues [`AnnounceDue`] into the
//!   session's event queue so the announcement is built from the session's
//!   state at publish time.
//! - **Inbound**: [`decode_inbound`] turns raw transport messages into
//!   [`Inbound`] events and [`apply_announcement`] folds an announcement
//!   into a [`RoomStore`](parley_room::RoomStore).

mod announcer;
mod inbound;

pub use announcer::{AnnounceDue, AnnouncerHandle, AnnouncerSet, DiscoveryConfig, spawn_announcer};
pub use inbound::{Discovered, Inbound, announcement, apply_announcement, decode_inbound};
