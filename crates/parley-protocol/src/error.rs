//! Error types for the protocol layer.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed.
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed: malformed JSON, missing fields, a room name
    /// that doesn't validate, and so on.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// A room name is empty or contains whitespace or topic syntax.
    #[error("invalid room name {0:?}")]
    InvalidRoomName(String),

    /// An account name is blank.
    #[error("account name must not be blank")]
    InvalidAccount,

    /// Traffic that decodes but makes no sense at the protocol level,
    /// e.g. a payload on a topic outside the `room/` namespace.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
