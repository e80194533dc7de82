//! Binary object serializer for netszr.
//!
//! Values travel as compact, deterministic bytes:
//!
//! - **Type table** ([`TypeTableBuilder`], [`TypeTable`]): the closed set
//!   of types a peer can send, with ids both peers derive identically
//! - **serde bridge** ([`to_vec`], [`from_slice`]): the wire mapping for any
//!   `Serialize` / `Deserialize` type, strings going through the mapped
//!   string table
//! - **Serializer** ([`BinarySerializer`]): type-tagged encoding that decodes
//!   into a [`NetObject`] without knowing the type up front
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use netszr_serializer::{BinarySerializer, NetSerializable, TypeTableBuilder};
//! use netszr_strings::MappedStringDict;
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, PartialEq, Serialize, Deserialize)]
//! struct Examine {
//!     target: String,
//! }
//!
//! impl NetSerializable for Examine {
//!     const WIRE_NAME: &'static str = "Examine";
//! }
//!
//! let dict = MappedStringDict::default();
//! dict.add_string("wall").unwrap();
//! dict.finalize().unwrap();
//!
//! let table = TypeTableBuilder::new().register::<Examine>().build().unwrap();
//! let serializer = BinarySerializer::new(Arc::new(table), Arc::new(dict));
//!
//! let bytes = serializer.serialize(&Examine { target: "wall".into() }).unwrap();
//! let back: Examine = serializer.deserialize_as(&bytes).unwrap();
//! assert_eq!(back.target, "wall");
//! ```

mod codec;
mod de;
mod error;
mod ser;
mod serializer;
mod table;

pub use codec::Codec;
pub use de::{DEFAULT_MAX_DEPTH, WireDeserializer, from_slice, from_slice_with_max_depth};
pub use error::SerializerError;
pub use ser::{WireSerializer, to_vec};
pub use serializer::{BinarySerializer, NetObject, SerializerStatsSnapshot};
pub use table::{NetSerializable, TypeTable, TypeTableBuilder};
