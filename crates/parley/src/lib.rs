//! # Parley
//!
//! Decentralized multi-room chat over a publish/subscribe broker.
//!
//! No server keeps track of rooms or members. Every client announces the
//! room it sits in twice a second and builds its own picture of who is
//! where from everyone else's announcements. Members that fall silent are
//! shown offline after two seconds and forgotten after five.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use parley::prelude::*;
//!
//! # async fn run() -> Result<(), ParleyError> {
//! let broker = MemoryBroker::new();
//! let alice = ClientBuilder::new().account("alice").connect_memory(&broker)?;
//! alice.add_room("lobby").await?;
//! alice.change_draft("anyone here?").await?;
//! alice.send_draft().await?;
//!
//! let snapshot = alice.snapshot();
//! for account in snapshot.current().map(|r| r.online_members()).unwrap_or_default() {
//!     println!("{account} is online");
//! }
//! # Ok(())
//! # }
//! ```

mod client;
mod config;
mod error;
pub mod logging;

pub use client::ClientBuilder;
pub use config::{
    ClientConfig, ENV_ACCOUNT, ENV_BROKER_PATH, ENV_BROKER_PORT, ENV_BROKER_URL, ENV_PASSWORD,
    ENV_USERNAME,
};
pub use error::ParleyError;

pub use parley_discovery as discovery;
pub use parley_presence as presence;
pub use parley_protocol as protocol;
pub use parley_room as room;
pub use parley_session as session;
pub use parley_transport as transport;

/// The types most applications need.
pub mod prelude {
    pub use crate::{ClientBuilder, ClientConfig, ParleyError};
    pub use parley_discovery::DiscoveryConfig;
    pub use parley_presence::PresenceConfig;
    pub use parley_protocol::{Account, Clock, RoomName, SystemClock, Timestamp};
    pub use parley_room::{MemberInfo, Message, Room, RoomStore};
    pub use parley_session::{SessionConfig, SessionError, SessionHandle, SessionSnapshot};
    pub use parley_transport::{Credentials, MemoryBroker, WsBroker};
}
