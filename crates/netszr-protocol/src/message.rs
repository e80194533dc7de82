//! The messages exchanged while synchronizing string tables.
//!
//! ```text
//!   Server                                 Client
//!     │ ── ServerHandshake { hash } ────────→ │  cache lookup
//!     │ ←─ ClientHandshake { needs: true } ── │  (miss)
//!     │ ── StringsPackage { package } ──────→ │  verify + adopt + cache
//!     │ ←─ ClientHandshake { needs: false } ─ │
//!   done                                     done
//! ```
//!
//! On a cache hit the client answers the first message with
//! `needs_strings: false` and the package is never sent.

use std::fmt;

/// A handshake message, as carried in one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandshakeMessage {
    /// Server → client: the hash of the server's frozen string table.
    ServerHandshake { hash: Vec<u8> },

    /// Client → server: whether the client still needs the package.
    ClientHandshake { needs_strings: bool },

    /// Server → client: the full string package.
    StringsPackage { package: Vec<u8> },

    /// Either direction: the sender is closing the channel because the
    /// handshake failed.
    Disconnect { reason: String },
}

impl HandshakeMessage {
    /// Tag byte that starts a frame carrying this message.
    pub fn tag(&self) -> u8 {
        match self {
            Self::ServerHandshake { .. } => tag::SERVER_HANDSHAKE,
            Self::ClientHandshake { .. } => tag::CLIENT_HANDSHAKE,
            Self::StringsPackage { .. } => tag::STRINGS_PACKAGE,
            Self::Disconnect { .. } => tag::DISCONNECT,
        }
    }

    /// Short name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ServerHandshake { .. } => "server_handshake",
            Self::ClientHandshake { .. } => "client_handshake",
            Self::StringsPackage { .. } => "strings_package",
            Self::Disconnect { .. } => "disconnect",
        }
    }
}

impl fmt::Display for HandshakeMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ServerHandshake { hash } => write!(f, "server_handshake({} byte hash)", hash.len()),
            Self::ClientHandshake { needs_strings } => {
                write!(f, "client_handshake(needs_strings={needs_strings})")
            }
            Self::StringsPackage { package } => write!(f, "strings_package({} bytes)", package.len()),
            Self::Disconnect { reason } => write!(f, "disconnect({reason})"),
        }
    }
}

/// Frame tag bytes.
pub mod tag {
    pub const SERVER_HANDSHAKE: u8 = 1;
    pub const CLIENT_HANDSHAKE: u8 = 2;
    pub const STRINGS_PACKAGE: u8 = 3;
    pub const DISCONNECT: u8 = 4;
}
