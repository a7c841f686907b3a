//! Unified error type for Parley.

use parley_protocol::ProtocolError;
use parley_room::RoomError;
use parley_session::SessionError;
use parley_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attributes let `?` convert layer errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum ParleyError {
    /// Connecting, subscribing or publishing failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A payload or name failed to encode, decode or validate.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The room store refused an operation.
    #[error(transparent)]
    Room(#[from] RoomError),

    /// A session command was rejected.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Client configuration is unusable.
    #[error("invalid configuration: {0}")]
    Config(String),
}
