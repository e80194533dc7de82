//! Mapped strings for netszr.
//!
//! Most strings that cross the wire (prototype ids, resource paths,
//! component names) come from a finite set known to both peers before they
//! connect. This crate collects that set into a [`MappedStringDict`],
//! freezes it into a sorted [`MappedStrings`] table, and encodes each string
//! as a small varint index into that table. Anything not in the table is
//! sent inline.
//!
//! The server ships its table to clients as a compressed, hashed package;
//! clients keep received packages in a [`StringCache`] keyed by hash so the
//! transfer happens once per content change, not once per connection.

mod cache;
mod config;
mod decompose;
mod dict;
mod error;
mod mapped;

pub use cache::StringCache;
pub use config::{PackageLimits, StringsConfig};
pub use dict::MappedStringDict;
pub use error::StringsError;
pub use mapped::{HASH_LEN, MappedStrings, PackageHash};
