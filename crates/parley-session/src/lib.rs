//! Session controller for Parley.
//!
//! Two layers:
//!
//! 1. [`Session`] is the chat state machine. It is synchronous and performs
//!    no I/O; every operation returns the [`Effect`]s to carry out.
//! 2. [`spawn_session`] runs a `Session` inside an actor task wired to a
//!    transport, the announcers and the presence sweep. Callers talk to it
//!    through a [`SessionHandle`] and read [`SessionSnapshot`]s.
//!
//! ```text
//! SessionHandle ──commands──→ actor ──effects──→ PubSub / AnnouncerSet
//!      ↑                        ↑
//!   snapshots            transport events, AnnounceDue, sweep ticks
//! ```

mod actor;
mod config;
mod error;
mod session;

pub use actor::{SessionHandle, spawn_session};
pub use config::{SessionConfig, WELCOME_SENDER};
pub use error::SessionError;
pub use session::{Effect, Session, SessionSnapshot};
