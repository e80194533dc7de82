//! Transport abstraction for netszr.
//!
//! The serialization core never opens sockets. The networking layer hands
//! it something implementing [`Connection`]: a reliable, ordered channel of
//! whole frames. The handshake drivers only ever "send this frame" and
//! "wait for the next frame", so any transport (QUIC stream, WebSocket,
//! in-process queue) can carry them.
//!
//! [`memory::pair`] provides an in-process channel pair, used by tests and
//! by tools that run both peers in one process.

mod error;
pub mod memory;

pub use error::TransportError;
pub use memory::MemoryConnection;

use std::fmt;
use std::future::Future;

/// Opaque identifier for a channel (one connected peer).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelId(u64);

impl ChannelId {
    /// Creates a new `ChannelId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "chan-{}", self.0)
    }
}

/// A single reliable channel that carries whole frames.
///
/// The returned futures are `Send` so a driver generic over the connection
/// can run inside `tokio::spawn`.
pub trait Connection: Send + Sync + 'static {
    /// Sends one frame to the remote peer.
    fn send(
        &self,
        frame: &[u8],
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Receives the next frame from the remote peer.
    ///
    /// Returns `Ok(None)` when the channel is cleanly closed.
    fn recv(
        &self,
    ) -> impl Future<Output = Result<Option<Vec<u8>>, TransportError>> + Send;

    /// Closes the channel. The peer's next `recv` returns `Ok(None)` once
    /// all frames sent before the close have been read.
    fn close(&self) -> impl Future<Output = ()> + Send;

    /// Returns the identifier of this channel.
    fn id(&self) -> ChannelId;
}
