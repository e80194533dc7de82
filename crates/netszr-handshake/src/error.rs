//! Error types for the handshake layer.

use netszr_protocol::ProtocolError;
use netszr_strings::StringsError;
use netszr_transport::TransportError;

/// Errors that can end a handshake.
///
/// See [`is_peer_fault`](Self::is_peer_fault) for which variants the
/// drivers answer with a `Disconnect` message before closing the channel.
#[derive(Debug, thiserror::Error)]
pub enum HandshakeError {
    /// The peer sent a message that is not valid at this point of the
    /// exchange (a second strings request, a message out of order, a
    /// malformed hash).
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),

    /// The received package does not hash to what the server advertised.
    /// Fatal; the handshake is not retried.
    #[error("string package hash mismatch: expected {expected}, got {actual}")]
    HashMismatch { expected: String, actual: String },

    /// The received package could not be decoded (bad compression,
    /// malformed content, over the size limit).
    #[error("invalid string package: {0}")]
    InvalidPackage(#[source] StringsError),

    /// The handshake was abandoned because the channel disconnected.
    #[error("handshake cancelled")]
    Cancelled,

    /// The peer sent nothing within the configured receive timeout.
    #[error("handshake timed out")]
    Timeout,

    /// The channel closed before the handshake finished.
    #[error("channel closed during handshake")]
    ChannelClosed,

    /// The peer ended the handshake with a `Disconnect` message.
    #[error("peer disconnected: {0}")]
    RemoteDisconnect(String),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Strings(#[from] StringsError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl HandshakeError {
    /// Whether the peer should be told why the channel is being closed.
    pub fn is_peer_fault(&self) -> bool {
        matches!(
            self,
            Self::ProtocolViolation(_)
                | Self::HashMismatch { .. }
                | Self::InvalidPackage(_)
                | Self::Protocol(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_peer_fault_covers_received_data() {
        assert!(HandshakeError::ProtocolViolation("x".into()).is_peer_fault());
        assert!(HandshakeError::InvalidPackage(StringsError::CorruptPackage("x".into())).is_peer_fault());
        assert!(!HandshakeError::Timeout.is_peer_fault());
        assert!(!HandshakeError::Strings(StringsError::Locked).is_peer_fault());
    }
}
