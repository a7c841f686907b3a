//! Error types for the session layer.

use parley_protocol::{Account, ProtocolError, RoomName};
use parley_room::RoomError;

/// Reasons a session command is rejected.
///
/// None of these are fatal: the session state is left as it was and the
/// command simply has no effect.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// A new account name was blank.
    #[error("account name must not be empty")]
    EmptyAccountName,

    /// The new account name is the one already in use.
    #[error("account name is unchanged")]
    AccountUnchanged,

    /// Another member of the room already uses this account name.
    #[error("account name {account} is already taken in room {room}")]
    AccountNameTaken {
        /// The conflicting name.
        account: Account,
        /// Where it is taken.
        room: RoomName,
    },

    /// A room name failed validation.
    #[error(transparent)]
    InvalidRoomName(ProtocolError),

    /// The room store refused the operation, e.g. an empty draft.
    #[error(transparent)]
    Room(#[from] RoomError),

    /// The session actor has stopped.
    #[error("session is no longer running")]
    Unavailable,
}
