//! Handshake configuration.

use std::path::PathBuf;
use std::time::Duration;

use netszr_protocol::DEFAULT_MAX_PACKAGE_BYTES;
use serde::{Deserialize, Serialize};

/// Configuration for handshake behavior.
///
/// Both peers read this. The server only uses the timeout and the package
/// limit; `cache_dir` matters on the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HandshakeConfig {
    /// Where the client keeps received string packages.
    ///
    /// Default: `None`, meaning every connection downloads the package.
    pub cache_dir: Option<PathBuf>,

    /// How long (in milliseconds) to wait for the peer's next message.
    ///
    /// Default: 10 seconds.
    pub recv_timeout_ms: u64,

    /// Largest `StringsPackage` payload a frame may carry.
    ///
    /// Default: 16 MiB.
    pub max_package_bytes: usize,
}

impl Default for HandshakeConfig {
    fn default() -> Self {
        Self {
            cache_dir: None,
            recv_timeout_ms: 10_000,
            max_package_bytes: DEFAULT_MAX_PACKAGE_BYTES,
        }
    }
}

impl HandshakeConfig {
    pub fn recv_timeout(&self) -> Duration {
        Duration::from_millis(self.recv_timeout_ms)
    }
}
