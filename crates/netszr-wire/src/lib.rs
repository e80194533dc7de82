//! Primitive wire codecs for netszr.
//!
//! Everything here is deterministic: the same value always produces the
//! same bytes, and decoding is total (malformed input yields a
//! [`WireError`], never a panic or an unbounded allocation).
//!
//! - [`WireWriter`] / [`WireReader`]: varints, zigzag, little-endian floats.
//! - [`WireEncode`] / [`WireDecode`]: fixed encodings for primitives, half
//!   floats, glam math types and [`LegacyBitArray`].
//!
//! Floats of every width read back NaN as zero, so a NaN produced on one
//! machine can never poison the state of another. Serde types holding a
//! [`half::f16`] field get the same layout through [`f16_nan_safe`].

mod bitarray;
mod codec;
mod error;
pub mod f16_nan_safe;
mod math;
mod reader;
mod writer;

pub use bitarray::LegacyBitArray;
pub use codec::{WireDecode, WireEncode, from_bytes, to_bytes};
pub use error::WireError;
pub use reader::WireReader;
pub use writer::WireWriter;
