//! Error types for the protocol layer.
//!
//! A `ProtocolError` always means the bytes of a frame were wrong: an
//! unknown tag, a field over its size limit, or a truncated body. Whether
//! a well-formed message arrives at the right *time* is the handshake
//! state machine's concern, not this crate's.

use netszr_wire::WireError;

/// Errors that can occur while decoding a handshake frame.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// The frame was empty.
    #[error("empty frame")]
    EmptyFrame,

    /// The first byte of the frame is not a known message tag.
    #[error("unknown message tag {0}")]
    UnknownTag(u8),

    /// A length-prefixed field declares more bytes than its limit.
    ///
    /// Checked before any allocation, so a hostile peer cannot make us
    /// reserve memory by lying about a length.
    #[error("{field} length {len} exceeds limit {limit}")]
    FieldTooLarge {
        field: &'static str,
        len: u64,
        limit: u64,
    },

    /// The frame body is malformed at the byte level.
    #[error(transparent)]
    Wire(#[from] WireError),
}
