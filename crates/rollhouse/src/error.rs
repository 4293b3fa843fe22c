//! Unified error type for the Rollhouse server.

use rollhouse_protocol::ProtocolError;
use rollhouse_room::RoomError;
use rollhouse_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant generates the `From` impls, so
/// `?` converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum RollhouseError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A room-level error that escaped a handler.
    #[error(transparent)]
    Room(#[from] RoomError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::ConnectionClosed("gone".into());
        let rollhouse_err: RollhouseError = err.into();
        assert!(matches!(rollhouse_err, RollhouseError::Transport(_)));
        assert!(rollhouse_err.to_string().contains("gone"));
    }

    #[test]
    fn test_from_protocol_error() {
        let err = ProtocolError::InvalidMessage("bad".into());
        let rollhouse_err: RollhouseError = err.into();
        assert!(matches!(rollhouse_err, RollhouseError::Protocol(_)));
    }

    #[test]
    fn test_room_error_keeps_player_message() {
        let err = RoomError::RoomNotFound("ABCD".into());
        let rollhouse_err: RollhouseError = err.into();
        assert!(matches!(rollhouse_err, RollhouseError::Room(_)));
        assert_eq!(rollhouse_err.to_string(), "Room not found.");
    }
}
