//! Error types for the serializer.

use std::fmt::Display;

use netszr_strings::StringsError;
use netszr_wire::WireError;

/// Errors from the type table, the serde bridge or the serializer itself.
#[derive(Debug, thiserror::Error)]
pub enum SerializerError {
    /// The value's type is not in the type table.
    #[error("type {0} is not registered")]
    UnregisteredType(String),

    /// The header names a type id the table does not have.
    #[error("unknown type id {0}")]
    UnknownTypeId(u64),

    /// Two registrations used the same wire name.
    #[error("wire name {0:?} registered twice")]
    DuplicateName(String),

    /// The same Rust type was registered under two wire names.
    #[error("type {0} registered twice")]
    DuplicateType(&'static str),

    /// The peer's type table differs from ours.
    #[error("type table mismatch: local {local}, remote {remote}")]
    TypeTableMismatch { local: String, remote: String },

    /// `deserialize_as` decoded a different type than requested.
    #[error("expected {expected}, decoded {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    /// The input nests deeper than the decoder allows.
    #[error("input nested deeper than {0} levels")]
    DepthLimitExceeded(usize),

    /// A sequence or map was serialized without a known length.
    #[error("sequence length must be known up front")]
    LengthRequired,

    /// The format is not self-describing, so it cannot be decoded
    /// without knowing the target type.
    #[error("{0} is not supported by this format")]
    Unsupported(&'static str),

    /// An error raised by a `Serialize` or `Deserialize` implementation.
    #[error("{0}")]
    Message(String),

    #[error(transparent)]
    Wire(#[from] WireError),

    #[error(transparent)]
    Strings(#[from] StringsError),
}

impl serde::ser::Error for SerializerError {
    fn custom<T: Display>(msg: T) -> Self {
        Self::Message(msg.to_string())
    }
}

impl serde::de::Error for SerializerError {
    fn custom<T: Display>(msg: T) -> Self {
        Self::Message(msg.to_string())
    }
}
