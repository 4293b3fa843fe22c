//! Error types for the protocol layer.

/// Errors raised while encoding or decoding wire messages.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed.
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// The bytes were not valid JSON, or did not match the expected shape
    /// (missing fields, wrong types). Clients see this as a malformed
    /// request.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The message decoded but breaks a protocol rule.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}

impl ProtocolError {
    /// `true` when the error came from reading client input.
    pub fn is_malformed_input(&self) -> bool {
        match self {
            #[cfg(feature = "json")]
            Self::Decode(_) => true,
            Self::InvalidMessage(_) => true,
            #[cfg(feature = "json")]
            Self::Encode(_) => false,
        }
    }
}
