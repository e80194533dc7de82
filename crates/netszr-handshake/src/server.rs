//! Server side of the handshake: one pending record per channel.
//!
//! The server drives each channel through:
//!
//! ```text
//! start() ──→ [awaiting client] ──(needs=true)──→ [package sent]
//!                  │                                    │
//!                  └──────(needs=false)─────────────────┴──→ complete
//!
//! disconnect() at any point ──→ removed, waiter cancelled
//! ```
//!
//! # Concurrency note
//!
//! Records live in a [`DashMap`], so channels on different shards never
//! contend and no lock is ever held across an `.await`. Completion is
//! signalled through a `oneshot`; removing a record drops its sender,
//! which is how cancellation reaches the waiter.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use netszr_protocol::HandshakeMessage;
use netszr_strings::{MappedStringDict, MappedStrings};
use netszr_transport::ChannelId;
use tokio::sync::oneshot;

use crate::HandshakeError;

/// Server-side record of a handshake in progress.
struct PendingHandshake {
    /// Set once the client has asked for the package.
    strings_requested: bool,
    done: oneshot::Sender<()>,
}

/// Tracks the handshake of every channel the server is currently
/// synchronizing.
pub struct HandshakeServer {
    dict: Arc<MappedStringDict>,
    pending: DashMap<ChannelId, PendingHandshake>,
}

impl HandshakeServer {
    pub fn new(dict: Arc<MappedStringDict>) -> Self {
        Self {
            dict,
            pending: DashMap::new(),
        }
    }

    pub fn dict(&self) -> &Arc<MappedStringDict> {
        &self.dict
    }

    /// Begins the handshake on `channel`.
    ///
    /// Freezes the dictionary on first use. Returns the `ServerHandshake`
    /// message to send and a waiter that resolves when the client
    /// confirms or the channel is disconnected.
    ///
    /// # Errors
    /// [`HandshakeError::ProtocolViolation`] if a handshake is already in
    /// progress on `channel`.
    pub fn start(
        &self,
        channel: ChannelId,
    ) -> Result<(HandshakeMessage, HandshakeWaiter), HandshakeError> {
        let table = self.dict.finalize()?;

        let (tx, rx) = oneshot::channel();
        match self.pending.entry(channel) {
            Entry::Occupied(_) => {
                return Err(HandshakeError::ProtocolViolation(format!(
                    "handshake already in progress on {channel}"
                )));
            }
            Entry::Vacant(slot) => {
                slot.insert(PendingHandshake {
                    strings_requested: false,
                    done: tx,
                });
            }
        }

        tracing::debug!(%channel, hash = %table.hash(), "handshake started");
        let message = HandshakeMessage::ServerHandshake {
            hash: table.hash().as_bytes().to_vec(),
        };
        Ok((message, HandshakeWaiter { rx }))
    }

    /// Handles the client's `ClientHandshake { needs_strings }`.
    ///
    /// Returns the `StringsPackage` to send when the client asked for it,
    /// or `None` once the client has confirmed and the handshake is
    /// complete.
    ///
    /// # Errors
    /// [`HandshakeError::ProtocolViolation`] if no handshake is in progress
    /// on `channel` or the client asks for the package twice. The record
    /// is removed in the second case; the caller should disconnect.
    pub fn on_client_handshake(
        &self,
        channel: ChannelId,
        needs_strings: bool,
    ) -> Result<Option<HandshakeMessage>, HandshakeError> {
        if !needs_strings {
            let Some((_, pending)) = self.pending.remove(&channel) else {
                return Err(not_in_progress(channel));
            };
            // The waiter may already be gone; completion still counts.
            let _ = pending.done.send(());
            tracing::info!(%channel, "handshake complete");
            return Ok(None);
        }

        // The guard must be released before `remove` touches the same shard.
        let duplicate = match self.pending.get_mut(&channel) {
            None => return Err(not_in_progress(channel)),
            Some(mut pending) => std::mem::replace(&mut pending.strings_requested, true),
        };
        if duplicate {
            self.pending.remove(&channel);
            tracing::warn!(%channel, "client requested strings twice");
            return Err(HandshakeError::ProtocolViolation(
                "client requested strings twice".into(),
            ));
        }

        let table = self.table()?;
        tracing::debug!(%channel, bytes = table.package().len(), "sending string package");
        Ok(Some(HandshakeMessage::StringsPackage {
            package: table.package().to_vec(),
        }))
    }

    /// Abandons the handshake on `channel`, if any. Its waiter resolves to
    /// [`HandshakeError::Cancelled`]. Returns whether a record was removed.
    pub fn disconnect(&self, channel: ChannelId) -> bool {
        let removed = self.pending.remove(&channel).is_some();
        if removed {
            tracing::debug!(%channel, "handshake cancelled");
        }
        removed
    }

    pub fn is_in_progress(&self, channel: ChannelId) -> bool {
        self.pending.contains_key(&channel)
    }

    /// Number of handshakes currently in progress.
    pub fn in_progress(&self) -> usize {
        self.pending.len()
    }

    fn table(&self) -> Result<Arc<MappedStrings>, HandshakeError> {
        Ok(Arc::clone(self.dict.frozen()?))
    }
}

fn not_in_progress(channel: ChannelId) -> HandshakeError {
    HandshakeError::ProtocolViolation(format!("no handshake in progress on {channel}"))
}

/// Resolves when the handshake it was issued for completes.
///
/// Yields `Ok(())` on completion and [`HandshakeError::Cancelled`] if the
/// record was removed for any other reason (disconnect, violation).
#[must_use = "a waiter does nothing unless awaited"]
pub struct HandshakeWaiter {
    rx: oneshot::Receiver<()>,
}

impl Future for HandshakeWaiter {
    type Output = Result<(), HandshakeError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|result| result.map_err(|_| HandshakeError::Cancelled))
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // -- Helpers ----------------------------------------------------------

    fn server() -> HandshakeServer {
        let dict = MappedStringDict::default();
        dict.add_string("textures/metal_wall").unwrap();
        HandshakeServer::new(Arc::new(dict))
    }

    fn chan(id: u64) -> ChannelId {
        ChannelId::new(id)
    }

    // =====================================================================
    // start()
    // =====================================================================

    #[test]
    fn test_start_locks_dictionary_and_advertises_hash() {
        let server = server();
        let (message, _waiter) = server.start(chan(1)).unwrap();

        let table = server.dict().frozen().unwrap();
        assert_eq!(
            message,
            HandshakeMessage::ServerHandshake {
                hash: table.hash().as_bytes().to_vec()
            }
        );
    }

    #[test]
    fn test_start_twice_on_same_channel_is_violation() {
        let server = server();
        let _first = server.start(chan(1)).unwrap();

        assert!(matches!(
            server.start(chan(1)),
            Err(HandshakeError::ProtocolViolation(_))
        ));
    }

    #[test]
    fn test_start_distinct_channels_are_independent() {
        let server = server();
        let _a = server.start(chan(1)).unwrap();
        let _b = server.start(chan(2)).unwrap();
        assert_eq!(server.in_progress(), 2);
    }

    // =====================================================================
    // on_client_handshake()
    // =====================================================================

    #[tokio::test]
    async fn test_cache_hit_completes_without_package() {
        let server = server();
        let (_, waiter) = server.start(chan(1)).unwrap();

        let reply = server.on_client_handshake(chan(1), false).unwrap();

        assert!(reply.is_none());
        waiter.await.unwrap();
        assert!(!server.is_in_progress(chan(1)));
    }

    #[tokio::test]
    async fn test_strings_request_returns_package_then_completes() {
        let server = server();
        let (_, waiter) = server.start(chan(1)).unwrap();

        let reply = server.on_client_handshake(chan(1), true).unwrap();
        let package = server.dict().frozen().unwrap().package().to_vec();
        assert_eq!(reply, Some(HandshakeMessage::StringsPackage { package }));

        assert!(server.on_client_handshake(chan(1), false).unwrap().is_none());
        waiter.await.unwrap();
    }

    #[tokio::test]
    async fn test_duplicate_strings_request_is_violation_and_cancels() {
        let server = server();
        let (_, waiter) = server.start(chan(1)).unwrap();
        server.on_client_handshake(chan(1), true).unwrap();

        let result = server.on_client_handshake(chan(1), true);

        assert!(matches!(result, Err(HandshakeError::ProtocolViolation(_))));
        assert!(!server.is_in_progress(chan(1)));
        assert!(matches!(waiter.await, Err(HandshakeError::Cancelled)));
    }

    #[test]
    fn test_client_handshake_without_start_is_violation() {
        let server = server();
        assert!(matches!(
            server.on_client_handshake(chan(9), false),
            Err(HandshakeError::ProtocolViolation(_))
        ));
        assert!(matches!(
            server.on_client_handshake(chan(9), true),
            Err(HandshakeError::ProtocolViolation(_))
        ));
    }

    // =====================================================================
    // disconnect()
    // =====================================================================

    #[tokio::test]
    async fn test_disconnect_cancels_waiter() {
        let server = server();
        let (_, waiter) = server.start(chan(1)).unwrap();

        assert!(server.disconnect(chan(1)));

        assert!(matches!(waiter.await, Err(HandshakeError::Cancelled)));
    }

    #[tokio::test]
    async fn test_restart_after_disconnect_completes() {
        let server = server();
        let (_, first) = server.start(chan(1)).unwrap();
        server.on_client_handshake(chan(1), true).unwrap();
        server.disconnect(chan(1));
        assert!(matches!(first.await, Err(HandshakeError::Cancelled)));

        let (_, second) = server.start(chan(1)).unwrap();
        // A fresh record: asking for strings again is allowed.
        assert!(server.on_client_handshake(chan(1), true).unwrap().is_some());
        server.on_client_handshake(chan(1), false).unwrap();
        second.await.unwrap();
    }

    #[test]
    fn test_disconnect_unknown_channel_returns_false() {
        assert!(!server().disconnect(chan(3)));
    }
}
