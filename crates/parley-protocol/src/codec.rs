//! Payload codecs.
//!
//! Every peer must agree on the payload format, so in practice there is one
//! codec per deployment. The trait exists so the session layer can be
//! driven with a codec of the caller's choosing and so decode failures have
//! one error type regardless of format.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Converts wire records to payload bytes and back.
///
/// `Send + Sync + 'static` because the codec lives inside the long-running
/// session actor task.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a record into payload bytes.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Parses payload bytes into a record.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` for malformed payloads, missing
    /// fields, or values the record type refuses (such as a room name with
    /// whitespace).
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

/// A [`Codec`] producing UTF-8 JSON, the format the chat wire contract uses.
///
/// ```rust
/// use parley_protocol::{Account, Announcement, Codec, JsonCodec, RoomName, Timestamp};
///
/// let codec = JsonCodec;
/// let announcement = Announcement {
///     account: Account::new("alice").unwrap(),
///     room: RoomName::parse("lobby").unwrap(),
///     last_seen: Timestamp::from_millis(1_700_000_000_000),
///     online: true,
/// };
///
/// let bytes = codec.encode(&announcement).unwrap();
/// let decoded: Announcement = codec.decode(&bytes).unwrap();
/// assert_eq!(announcement, decoded);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}

#[cfg(all(test, feature = "json"))]
mod tests {
    use super::*;
    use crate::{Account, ChatMessage};

    #[test]
    fn test_json_codec_decode_garbage_is_decode_error() {
        let result: Result<ChatMessage, _> = JsonCodec.decode(b"not json");
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }

    #[test]
    fn test_json_codec_decode_missing_field_is_decode_error() {
        let result: Result<ChatMessage, _> = JsonCodec.decode(br#"{"text":"hi"}"#);
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }

    #[test]
    fn test_json_codec_output_is_utf8() {
        let msg = ChatMessage {
            sender: Account::new("zoë").unwrap(),
            text: "grüße".into(),
        };
        let bytes = JsonCodec.encode(&msg).unwrap();
        assert!(String::from_utf8(bytes).is_ok());
    }
}
