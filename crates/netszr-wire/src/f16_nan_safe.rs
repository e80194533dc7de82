//! Serde adapter for [`f16`] fields.
//!
//! `half` has no serde support of its own in this workspace. Use it with
//! `#[serde(with = "netszr_wire::f16_nan_safe")]`. The field is written as
//! its raw 16 bits, little-endian, which is the layout [`WireEncode`] uses,
//! and a NaN reads back as zero.
//!
//! ```
//! use half::f16;
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize)]
//! struct Light {
//!     #[serde(with = "netszr_wire::f16_nan_safe")]
//!     intensity: f16,
//! }
//! ```
//!
//! [`WireEncode`]: crate::WireEncode

use half::f16;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::codec::f16_from_bits;

pub fn serialize<S: Serializer>(value: &f16, serializer: S) -> Result<S::Ok, S::Error> {
    value.to_bits().to_le_bytes().serialize(serializer)
}

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f16, D::Error> {
    let bytes = <[u8; 2]>::deserialize(deserializer)?;
    Ok(f16_from_bits(u16::from_le_bytes(bytes)))
}
