//! Aggregated configuration.

use netszr_handshake::HandshakeConfig;
use netszr_strings::{PackageLimits, StringsConfig};
use serde::{Deserialize, Serialize};

use crate::NetszrError;

/// Every tunable of the stack in one place.
///
/// Missing sections and fields fall back to their defaults, so an empty
/// JSON object is a valid configuration:
///
/// ```rust
/// use netszr::NetszrConfig;
///
/// let config = NetszrConfig::from_json(r#"{ "handshake": { "recv_timeout_ms": 2500 } }"#).unwrap();
/// assert_eq!(config.handshake.recv_timeout_ms, 2500);
/// assert_eq!(config.strings.max_len, 420);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetszrConfig {
    /// Which strings are mapped and how far they are decomposed.
    pub strings: StringsConfig,

    /// Compression level and decompression bound of the string package.
    pub package: PackageLimits,

    /// Cache directory, timeouts and frame limits of the handshake.
    pub handshake: HandshakeConfig,
}

impl NetszrConfig {
    pub fn from_json(json: &str) -> Result<Self, NetszrError> {
        Ok(serde_json::from_str(json)?)
    }
}
