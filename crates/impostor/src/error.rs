//! Unified error type for the impostor server.

use impostor_protocol::ProtocolError;
use impostor_room::RoomError;
use impostor_transport::TransportError;

/// Top-level error that wraps the errors of the layers below.
///
/// The `#[from]` attributes let `?` convert sub-crate errors directly.
#[derive(Debug, thiserror::Error)]
pub enum ImpostorError {
    /// Binding, accepting, sending or receiving failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A message could not be encoded or decoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A room rejected an event.
    #[error(transparent)]
    Room(#[from] RoomError),
}

#[cfg(test)]
mod tests {
    use impostor_protocol::{PlayerId, RoomCode};

    use super::*;

    #[test]
    fn test_from_transport_error() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "gone");
        let err: ImpostorError = TransportError::SendFailed(io).into();
        assert!(matches!(err, ImpostorError::Transport(_)));
        assert!(err.to_string().contains("gone"));
    }

    #[test]
    fn test_from_protocol_error() {
        let err: ImpostorError = ProtocolError::InvalidMessage("bad".into()).into();
        assert!(matches!(err, ImpostorError::Protocol(_)));
    }

    #[test]
    fn test_from_room_error_keeps_message() {
        let code = RoomCode::parse("ABCD12").unwrap();
        let err: ImpostorError = RoomError::NotFound(code).into();
        assert!(matches!(err, ImpostorError::Room(_)));
        assert_eq!(err.to_string(), "room ABCD12 not found");

        let err: ImpostorError = RoomError::NotHost(PlayerId(3)).into();
        assert!(err.to_string().contains("P-3"));
    }
}
