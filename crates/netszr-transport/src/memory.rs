//! In-process channel pair backed by Tokio mpsc queues.

use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{Mutex, mpsc};

use crate::{ChannelId, Connection, TransportError};

/// Counter for generating unique channel IDs.
static NEXT_CHANNEL_ID: AtomicU64 = AtomicU64::new(1);

/// One end of an in-process channel created by [`pair`].
pub struct MemoryConnection {
    id: ChannelId,
    /// `None` once this end has been closed.
    tx: Mutex<Option<mpsc::UnboundedSender<Vec<u8>>>>,
    rx: Mutex<mpsc::UnboundedReceiver<Vec<u8>>>,
}

/// Creates two connected ends sharing one [`ChannelId`].
///
/// Frames sent on one end are received, in order, on the other.
pub fn pair() -> (MemoryConnection, MemoryConnection) {
    let id = ChannelId::new(NEXT_CHANNEL_ID.fetch_add(1, Ordering::Relaxed));
    let (a_tx, b_rx) = mpsc::unbounded_channel();
    let (b_tx, a_rx) = mpsc::unbounded_channel();

    tracing::debug!(%id, "created in-memory channel pair");

    let a = MemoryConnection {
        id,
        tx: Mutex::new(Some(a_tx)),
        rx: Mutex::new(a_rx),
    };
    let b = MemoryConnection {
        id,
        tx: Mutex::new(Some(b_tx)),
        rx: Mutex::new(b_rx),
    };
    (a, b)
}

impl Connection for MemoryConnection {
    async fn send(&self, frame: &[u8]) -> Result<(), TransportError> {
        let guard = self.tx.lock().await;
        let tx = guard.as_ref().ok_or(TransportError::Closed(self.id))?;
        tx.send(frame.to_vec())
            .map_err(|_| TransportError::Closed(self.id))
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, TransportError> {
        Ok(self.rx.lock().await.recv().await)
    }

    async fn close(&self) {
        if self.tx.lock().await.take().is_some() {
            tracing::debug!(id = %self.id, "in-memory channel closed");
        }
    }

    fn id(&self) -> ChannelId {
        self.id
    }
}
