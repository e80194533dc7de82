//! Error types for the wire layer.
//!
//! Every decode path in the workspace bottoms out in [`WireReader`]
//! (crate::WireReader), so these are the errors an adversarial peer can
//! provoke. None of them allocate based on attacker-controlled sizes.

/// Errors produced while reading or validating wire data.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WireError {
    /// The input ended before a value was complete.
    #[error("unexpected end of input: needed {needed} bytes, {remaining} remaining")]
    UnexpectedEof {
        /// Bytes the current read required.
        needed: usize,
        /// Bytes left in the input.
        remaining: usize,
    },

    /// A varint ran past its maximum width or overflowed the target type.
    #[error("varint overflows {0}")]
    VarintOverflow(&'static str),

    /// A length prefix claims more data than the input (or a limit) allows.
    #[error("length {len} exceeds limit {limit}")]
    LengthTooLarge {
        /// The decoded length prefix.
        len: u64,
        /// The bound it was checked against.
        limit: u64,
    },

    /// A byte sequence that must be UTF-8 was not.
    #[error("invalid utf-8 in string")]
    InvalidUtf8,

    /// A boolean byte was neither 0 nor 1.
    #[error("invalid bool byte {0}")]
    InvalidBool(u8),

    /// A `char` value was not a valid Unicode scalar.
    #[error("invalid char scalar {0:#x}")]
    InvalidChar(u64),

    /// A complete value was read but input remains.
    #[error("{0} trailing bytes after value")]
    TrailingBytes(usize),

    /// A value decoded structurally but violates its own invariants.
    #[error("invalid value: {0}")]
    InvalidValue(String),
}
