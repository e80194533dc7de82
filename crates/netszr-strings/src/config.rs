//! Tunables for string mapping and packaging.

use serde::{Deserialize, Serialize};

/// Controls which strings enter the mapping and how far decomposition goes.
///
/// Lengths are measured in UTF-8 bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StringsConfig {
    /// A string must be strictly longer than this to be mapped.
    ///
    /// Default: 3. Shorter strings cost less to send raw than as an index.
    pub min_len: usize,

    /// A string must be strictly shorter than this to be mapped.
    ///
    /// Default: 420.
    pub max_len: usize,

    /// Token count above which contiguous token spans are no longer
    /// generated during decomposition. Individual tokens and the whole
    /// string are still added.
    ///
    /// Default: 16.
    pub max_span_tokens: usize,
}

impl Default for StringsConfig {
    fn default() -> Self {
        Self {
            min_len: 3,
            max_len: 420,
            max_span_tokens: 16,
        }
    }
}

impl StringsConfig {
    /// Whether a string of this length may be mapped.
    pub fn accepts(&self, s: &str) -> bool {
        s.len() > self.min_len && s.len() < self.max_len
    }
}

/// Limits applied when producing or loading a string package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PackageLimits {
    /// Hard bound on decompressed package size. Loading stops as soon as
    /// the decompressor produces more than this.
    ///
    /// Default: 16 MiB.
    pub max_decompressed_bytes: usize,

    /// zstd compression level for generated packages. The package hash is
    /// computed over the uncompressed content, so changing this never
    /// changes the hash.
    ///
    /// Default: 3.
    pub compression_level: i32,
}

impl Default for PackageLimits {
    fn default() -> Self {
        Self {
            max_decompressed_bytes: 16 * 1024 * 1024,
            compression_level: 3,
        }
    }
}
