//! Handshake wire protocol for netszr.
//!
//! This crate defines the four messages peers exchange to agree on a
//! mapped string table ([`HandshakeMessage`]) and how each is laid out in a
//! frame ([`FrameCodec`]). It knows nothing about connections or string
//! tables; it only turns messages into bytes and back, rejecting anything
//! malformed or oversized before allocating for it.
//!
//! ```text
//! Transport (frames) → Protocol (HandshakeMessage) → Handshake (state machine)
//! ```

mod error;
mod frame;
mod message;

pub use error::ProtocolError;
pub use frame::{DEFAULT_MAX_PACKAGE_BYTES, FrameCodec, MAX_HASH_LEN, MAX_REASON_LEN};
pub use message::{HandshakeMessage, tag};
