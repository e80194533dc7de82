//! Unified error type for netszr.

use netszr_handshake::HandshakeError;
use netszr_protocol::ProtocolError;
use netszr_serializer::SerializerError;
use netszr_strings::StringsError;
use netszr_transport::TransportError;
use netszr_wire::WireError;

/// Top-level error that wraps every layer's error.
///
/// Each variant has a `#[from]`, so `?` lifts sub-crate errors into this
/// one without any mapping at the call site.
#[derive(Debug, thiserror::Error)]
pub enum NetszrError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Wire(#[from] WireError),

    #[error(transparent)]
    Strings(#[from] StringsError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Handshake(#[from] HandshakeError),

    #[error(transparent)]
    Serializer(#[from] SerializerError),

    /// The configuration could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}
