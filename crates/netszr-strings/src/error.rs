//! Error types for the mapped string layer.

use netszr_wire::WireError;

/// Errors from building, packaging or using a string mapping.
#[derive(Debug, thiserror::Error)]
pub enum StringsError {
    /// The dictionary is frozen; it can no longer be modified.
    #[error("mapped strings are locked")]
    Locked,

    /// The dictionary has not been frozen yet, so there is no table to
    /// encode against.
    #[error("mapped strings are not locked yet")]
    NotLocked,

    /// A mapped index pointed past the end of the table.
    #[error("mapped string index {index} out of range for {len} strings")]
    UnknownIndex { index: u64, len: usize },

    /// A string package failed validation.
    #[error("corrupt string package: {0}")]
    CorruptPackage(String),

    /// A string package decompressed to more than the configured bound.
    #[error("string package exceeds {limit} decompressed bytes")]
    PackageTooLarge { limit: usize },

    #[error(transparent)]
    Wire(#[from] WireError),

    /// Compression, decompression or cache file I/O failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
