//! Codec trait and implementations for turning wire types into bytes.
//!
//! The handler only talks to the [`Codec`] trait, so the JSON format used
//! by browser clients can sit next to a binary one later without touching
//! the rooms.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Encodes Rust values to bytes and decodes them back.
///
/// `Send + Sync + 'static` because one codec instance is shared by every
/// connection task.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed or don't
    /// match the expected type.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] backed by `serde_json`. Behind the `json` feature (default).
///
/// ```rust
/// use rollhouse_protocol::{ClientIntent, Codec, JsonCodec, ServerEvent};
///
/// let codec = JsonCodec;
///
/// let intent: ClientIntent = codec.decode(br#"{"type":"bank"}"#).unwrap();
/// assert_eq!(intent, ClientIntent::Bank);
///
/// let bytes = codec
///     .encode(&ServerEvent::Error { message: "Room not found.".into() })
///     .unwrap();
/// assert_eq!(bytes, br#"{"type":"error","message":"Room not found."}"#);
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
    use crate::{ClientIntent, RoomCode, ServerEvent};

    #[test]
    fn test_decode_garbage_is_malformed() {
        let err = JsonCodec.decode::<ClientIntent>(b"{not json").unwrap_err();
        assert!(matches!(err, ProtocolError::Decode(_)));
        assert!(err.is_malformed_input());
    }

    #[test]
    fn test_decode_wrong_shape_is_malformed() {
        let err = JsonCodec
            .decode::<ClientIntent>(br#"{"type":"join","room":5}"#)
            .unwrap_err();
        assert!(err.is_malformed_input());
    }

    #[test]
    fn test_encode_room_created() {
        let bytes = JsonCodec
            .encode(&ServerEvent::RoomCreated { room: RoomCode::from("ABCD") })
            .unwrap();
        assert_eq!(bytes, br#"{"type":"room_created","room":"ABCD"}"#);
    }
}
