//! Error types for the room store.

use parley_protocol::RoomName;

/// Errors returned by [`RoomStore`](crate::RoomStore) mutations.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// The room does not exist locally.
    #[error("room {0} not found")]
    NotFound(RoomName),

    /// The message text is empty or whitespace only.
    #[error("refusing empty message in room {0}")]
    EmptyMessage(RoomName),
}
