//! Peer helpers: run the string handshake on a connection, then exchange
//! serialized objects over it.
//!
//! The server owns the authoritative string table and one
//! [`BinarySerializer`] shared by every connection. Each client gets its
//! table from the server, so a client serializer only exists once
//! [`connect_client`] has finished.
//!
//! ```text
//! Server                                 Client
//!   │  NetServer::new (locks strings)      │
//!   │──── ServerHandshake ────────────────►│  cache lookup
//!   │◄─── ClientHandshake ─────────────────│
//!   │──── StringsPackage (on miss) ───────►│  verify + adopt
//!   │──── type table fingerprint ─────────►│  verify
//!   │                                      │  connect_client returns
//!   │──── send_object ────────────────────►│  recv_object
//! ```
//!
//! The fingerprint frame is 32 raw bytes. A client whose type table
//! differs closes the connection and fails with `TypeTableMismatch`.

use std::sync::Arc;

use netszr_handshake::{
    HandshakeClient, HandshakeConfig, HandshakeError, HandshakeServer, connect, serve,
};
use netszr_serializer::{BinarySerializer, NetObject, TypeTable};
use netszr_strings::MappedStringDict;
use netszr_transport::Connection;

use crate::{NetszrConfig, NetszrError};

/// Server side: the authoritative string table, the handshake registry and
/// the serializer shared by all connections.
pub struct NetServer {
    handshakes: Arc<HandshakeServer>,
    serializer: Arc<BinarySerializer>,
    config: HandshakeConfig,
}

impl NetServer {
    /// Locks `dict` and prepares to accept connections.
    ///
    /// # Errors
    /// Fails if the string package cannot be built.
    pub fn new(
        dict: Arc<MappedStringDict>,
        table: Arc<TypeTable>,
        config: &NetszrConfig,
    ) -> Result<Self, NetszrError> {
        let strings = dict.finalize()?;
        tracing::info!(
            strings = strings.len(),
            hash = %strings.hash(),
            types = table.len(),
            "netszr server ready"
        );
        Ok(Self {
            handshakes: Arc::new(HandshakeServer::new(Arc::clone(&dict))),
            serializer: Arc::new(BinarySerializer::new(table, dict)),
            config: config.handshake.clone(),
        })
    }

    pub fn serializer(&self) -> &Arc<BinarySerializer> {
        &self.serializer
    }

    pub fn handshakes(&self) -> &Arc<HandshakeServer> {
        &self.handshakes
    }

    /// Runs the server side of the handshake on `conn`, then sends the type
    /// table fingerprint.
    ///
    /// On success the connection is ready for [`send_object`] and
    /// [`recv_object`].
    pub async fn accept<C: Connection>(&self, conn: &C) -> Result<(), NetszrError> {
        serve(conn, &self.handshakes, &self.config).await?;
        conn.send(self.serializer.table().fingerprint().as_bytes())
            .await?;
        Ok(())
    }
}

/// Runs the client side of the handshake and returns a serializer bound to
/// the server's string table.
///
/// `table` must match the server's type table; ids are derived from wire
/// names, so registering the same types is enough. The server's
/// fingerprint is checked before this returns.
///
/// # Errors
/// Handshake failures, and
/// [`TypeTableMismatch`](netszr_serializer::SerializerError::TypeTableMismatch)
/// when the tables differ. The connection is closed in both cases.
pub async fn connect_client<C: Connection>(
    conn: &C,
    table: Arc<TypeTable>,
    config: &NetszrConfig,
) -> Result<BinarySerializer, NetszrError> {
    let dict = Arc::new(MappedStringDict::new(
        config.strings.clone(),
        config.package.clone(),
    ));
    let mut client = HandshakeClient::new(Arc::clone(&dict), &config.handshake);
    connect(conn, &mut client, &config.handshake).await?;

    if let Err(e) = verify_type_table(conn, &table, &config.handshake).await {
        tracing::warn!(channel = %conn.id(), error = %e, "type table check failed");
        conn.close().await;
        return Err(e);
    }
    Ok(BinarySerializer::new(table, dict))
}

async fn verify_type_table<C: Connection>(
    conn: &C,
    table: &TypeTable,
    config: &HandshakeConfig,
) -> Result<(), NetszrError> {
    let frame = match tokio::time::timeout(config.recv_timeout(), conn.recv()).await {
        Ok(Ok(Some(frame))) => frame,
        Ok(Ok(None)) => return Err(HandshakeError::ChannelClosed.into()),
        Ok(Err(e)) => return Err(e.into()),
        Err(_) => return Err(HandshakeError::Timeout.into()),
    };
    table.verify_fingerprint(&frame)?;
    Ok(())
}

/// Serializes `value` in the generic form and sends it as one frame.
pub async fn send_object<C, T>(
    conn: &C,
    serializer: &BinarySerializer,
    value: &T,
) -> Result<(), NetszrError>
where
    C: Connection,
    T: std::any::Any,
{
    let frame = serializer.serialize(value)?;
    conn.send(&frame).await?;
    Ok(())
}

/// Receives one frame and decodes it.
///
/// Returns `Ok(None)` when the peer closed the connection.
pub async fn recv_object<C: Connection>(
    conn: &C,
    serializer: &BinarySerializer,
) -> Result<Option<NetObject>, NetszrError> {
    let Some(frame) = conn.recv().await? else {
        return Ok(None);
    };
    match serializer.deserialize(&frame) {
        Ok(object) => Ok(Some(object)),
        Err(e) => {
            tracing::debug!(channel = %conn.id(), error = %e, "failed to decode object");
            Err(e.into())
        }
    }
}
