//! Async drivers that run a handshake over a [`Connection`].
//!
//! The state machines in [`server`](crate::HandshakeServer) and
//! [`client`](crate::HandshakeClient) never touch the network. These
//! functions pump frames between them and a connection:
//!   1. receive a frame (bounded by the configured timeout)
//!   2. decode it and feed it to the state machine
//!   3. send whatever reply the state machine produced
//!
//! If the peer misbehaves, the driver sends `Disconnect { reason }` and
//! closes the channel before returning the error.

use std::sync::Arc;

use netszr_protocol::{FrameCodec, HandshakeMessage, MAX_REASON_LEN};
use netszr_strings::MappedStrings;
use netszr_transport::{ChannelId, Connection};

use crate::{HandshakeClient, HandshakeConfig, HandshakeError, HandshakeServer};

/// Removes the server's record for a channel when the driver exits, so an
/// early return or a dropped future can never leave a stale handshake.
struct PendingGuard<'a> {
    server: &'a HandshakeServer,
    channel: ChannelId,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.server.disconnect(self.channel);
    }
}

/// Runs the server side of the handshake on `conn` until the client
/// confirms it holds the current string table.
pub async fn serve<C: Connection>(
    conn: &C,
    server: &HandshakeServer,
    config: &HandshakeConfig,
) -> Result<(), HandshakeError> {
    let codec = FrameCodec::new(config.max_package_bytes);
    let channel = conn.id();

    match serve_inner(conn, server, config, &codec, channel).await {
        Ok(()) => Ok(()),
        Err(e) => Err(abort(conn, &codec, e).await),
    }
}

async fn serve_inner<C: Connection>(
    conn: &C,
    server: &HandshakeServer,
    config: &HandshakeConfig,
    codec: &FrameCodec,
    channel: ChannelId,
) -> Result<(), HandshakeError> {
    let (hello, waiter) = server.start(channel)?;
    let _guard = PendingGuard { server, channel };
    conn.send(&codec.encode(&hello)).await?;

    loop {
        match recv_message(conn, codec, config).await? {
            HandshakeMessage::ClientHandshake { needs_strings } => {
                match server.on_client_handshake(channel, needs_strings)? {
                    Some(package) => conn.send(&codec.encode(&package)).await?,
                    None => break,
                }
            }
            HandshakeMessage::Disconnect { reason } => {
                return Err(HandshakeError::RemoteDisconnect(reason));
            }
            other => {
                return Err(HandshakeError::ProtocolViolation(format!(
                    "server received unexpected {}",
                    other.kind()
                )));
            }
        }
    }

    waiter.await
}

/// Runs the client side of the handshake on `conn`. Returns the adopted
/// string table.
pub async fn connect<C: Connection>(
    conn: &C,
    client: &mut HandshakeClient,
    config: &HandshakeConfig,
) -> Result<Arc<MappedStrings>, HandshakeError> {
    let codec = FrameCodec::new(config.max_package_bytes);

    match connect_inner(conn, client, config, &codec).await {
        Ok(table) => Ok(table),
        Err(e) => Err(abort(conn, &codec, e).await),
    }
}

async fn connect_inner<C: Connection>(
    conn: &C,
    client: &mut HandshakeClient,
    config: &HandshakeConfig,
    codec: &FrameCodec,
) -> Result<Arc<MappedStrings>, HandshakeError> {
    while !client.is_complete() {
        let reply = match recv_message(conn, codec, config).await? {
            HandshakeMessage::ServerHandshake { hash } => client.on_server_handshake(&hash)?,
            HandshakeMessage::StringsPackage { package } => client.on_strings_package(&package)?,
            HandshakeMessage::Disconnect { reason } => {
                return Err(HandshakeError::RemoteDisconnect(reason));
            }
            other => {
                return Err(HandshakeError::ProtocolViolation(format!(
                    "client received unexpected {}",
                    other.kind()
                )));
            }
        };
        conn.send(&codec.encode(&reply)).await?;
    }

    tracing::info!(channel = %conn.id(), "string handshake complete");
    Ok(Arc::clone(client.dict().frozen()?))
}

async fn recv_message<C: Connection>(
    conn: &C,
    codec: &FrameCodec,
    config: &HandshakeConfig,
) -> Result<HandshakeMessage, HandshakeError> {
    match tokio::time::timeout(config.recv_timeout(), conn.recv()).await {
        Ok(Ok(Some(frame))) => {
            let message = codec.decode(&frame)?;
            tracing::debug!(channel = %conn.id(), %message, "received handshake message");
            Ok(message)
        }
        Ok(Ok(None)) => Err(HandshakeError::ChannelClosed),
        Ok(Err(e)) => Err(e.into()),
        Err(_) => Err(HandshakeError::Timeout),
    }
}

/// Tells the peer why the handshake failed (if it was the peer's fault)
/// and closes the channel.
async fn abort<C: Connection>(conn: &C, codec: &FrameCodec, error: HandshakeError) -> HandshakeError {
    let channel = conn.id();
    if error.is_peer_fault() {
        let reason = truncate_reason(error.to_string());
        tracing::warn!(%channel, %reason, "disconnecting peer");
        let frame = codec.encode(&HandshakeMessage::Disconnect { reason });
        if let Err(e) = conn.send(&frame).await {
            tracing::debug!(%channel, error = %e, "failed to send disconnect");
        }
    } else {
        tracing::debug!(%channel, error = %error, "handshake aborted");
    }
    conn.close().await;
    error
}

fn truncate_reason(mut reason: String) -> String {
    let max = MAX_REASON_LEN as usize;
    if reason.len() > max {
        let mut cut = max;
        while !reason.is_char_boundary(cut) {
            cut -= 1;
        }
        reason.truncate(cut);
    }
    reason
}
