//! [`BinarySerializer`]: type-tagged object encoding over a frozen
//! [`TypeTable`] and string table.
//!
//! ## Generic form
//!
//! ```text
//! ┌──────────────────┬──────────────────────────────┐
//! │ varint type id   │ body (the type's own codec)  │
//! └──────────────────┴──────────────────────────────┘
//! ```
//!
//! The receiver does not need to know the type up front: the id selects the
//! decoder and the result comes back as a [`NetObject`].
//!
//! ## Direct form
//!
//! [`BinarySerializer::serialize_direct`] writes only the body. Both sides
//! must agree on the type out of band, and the bytes are not interchangeable
//! with the generic form.

use std::any::{Any, type_name};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use netszr_strings::{MappedStringDict, MappedStrings};
use netszr_wire::{WireReader, WireWriter};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::{DEFAULT_MAX_DEPTH, SerializerError, TypeTable, from_slice_with_max_depth, to_vec};

/// A decoded value of a type chosen by the sender.
pub struct NetObject {
    value: Box<dyn Any + Send>,
    wire_name: &'static str,
    type_name: &'static str,
}

impl NetObject {
    pub fn is<T: Any>(&self) -> bool {
        self.value.is::<T>()
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }

    /// Takes the value out, or hands the object back if it holds another type.
    pub fn downcast<T: Any>(self) -> Result<T, Self> {
        match self.value.downcast::<T>() {
            Ok(value) => Ok(*value),
            Err(value) => Err(Self {
                value,
                wire_name: self.wire_name,
                type_name: self.type_name,
            }),
        }
    }

    pub fn wire_name(&self) -> &'static str {
        self.wire_name
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn into_inner(self) -> Box<dyn Any + Send> {
        self.value
    }
}

impl fmt::Debug for NetObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NetObject")
            .field("wire_name", &self.wire_name)
            .field("type_name", &self.type_name)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Statistics
// ---------------------------------------------------------------------------

/// Point-in-time copy of a serializer's counters.
///
/// The counters are relaxed atomics, so a snapshot taken while other
/// threads are serializing may mix values from different moments.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SerializerStatsSnapshot {
    pub objects_serialized: u64,
    pub bytes_serialized: u64,
    pub largest_serialized: u64,
    pub objects_deserialized: u64,
    pub bytes_deserialized: u64,
    pub largest_deserialized: u64,
}

#[derive(Default)]
struct Counters {
    objects: AtomicU64,
    bytes: AtomicU64,
    largest: AtomicU64,
}

impl Counters {
    fn record(&self, len: usize) {
        let len = len as u64;
        self.objects.fetch_add(1, Ordering::Relaxed);
        self.bytes.fetch_add(len, Ordering::Relaxed);
        self.largest.fetch_max(len, Ordering::Relaxed);
    }
}

// ---------------------------------------------------------------------------
// BinarySerializer
// ---------------------------------------------------------------------------

/// Encodes and decodes registered types.
///
/// Every call needs the string table to be frozen; until then it fails
/// with [`StringsError::NotLocked`](netszr_strings::StringsError::NotLocked).
pub struct BinarySerializer {
    table: Arc<TypeTable>,
    dict: Arc<MappedStringDict>,
    serialized: Counters,
    deserialized: Counters,
    max_depth: usize,
}

impl BinarySerializer {
    pub fn new(table: Arc<TypeTable>, dict: Arc<MappedStringDict>) -> Self {
        tracing::debug!(
            types = table.len(),
            fingerprint = %table.fingerprint().to_hex(),
            "binary serializer created"
        );
        Self {
            table,
            dict,
            serialized: Counters::default(),
            deserialized: Counters::default(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Sets how deeply nested a decoded value may be.
    ///
    /// Default: [`DEFAULT_MAX_DEPTH`].
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn table(&self) -> &Arc<TypeTable> {
        &self.table
    }

    pub fn dict(&self) -> &Arc<MappedStringDict> {
        &self.dict
    }

    fn strings(&self) -> Result<&MappedStrings, SerializerError> {
        Ok(self.dict.frozen()?.as_ref())
    }

    /// Writes the type id of `value` followed by its body.
    pub fn serialize<T: Any>(&self, value: &T) -> Result<Vec<u8>, SerializerError> {
        self.serialize_erased(value, type_name::<T>())
    }

    /// Like [`serialize`](Self::serialize) for a value whose type is only
    /// known at runtime.
    pub fn serialize_any(&self, value: &dyn Any) -> Result<Vec<u8>, SerializerError> {
        self.serialize_erased(value, "<dyn Any>")
    }

    fn serialize_erased(&self, value: &dyn Any, name: &str) -> Result<Vec<u8>, SerializerError> {
        let id = self
            .table
            .id_of_type(value.type_id())
            .ok_or_else(|| SerializerError::UnregisteredType(name.to_owned()))?;
        let entry = self
            .table
            .entry(u64::from(id))
            .ok_or(SerializerError::UnknownTypeId(u64::from(id)))?;
        let strings = self.strings()?;

        let mut w = WireWriter::new();
        w.write_varint(u64::from(id));
        entry.encode(value, &mut w, strings)?;

        self.serialized.record(w.len());
        Ok(w.into_bytes())
    }

    /// Reads a type id and decodes the matching type.
    ///
    /// # Errors
    /// Unknown ids, malformed bodies and trailing bytes are all errors.
    pub fn deserialize(&self, bytes: &[u8]) -> Result<NetObject, SerializerError> {
        let strings = self.strings()?;
        let mut r = WireReader::new(bytes);
        let id = r.read_varint()?;
        let entry = self
            .table
            .entry(id)
            .ok_or(SerializerError::UnknownTypeId(id))?;
        let value = entry.decode(&mut r, strings, self.max_depth)?;
        r.finish()?;

        self.deserialized.record(bytes.len());
        Ok(NetObject {
            value,
            wire_name: entry.name,
            type_name: entry.type_name,
        })
    }

    /// [`deserialize`](Self::deserialize), then require the result to be a `T`.
    pub fn deserialize_as<T: Any>(&self, bytes: &[u8]) -> Result<T, SerializerError> {
        self.deserialize(bytes)?
            .downcast::<T>()
            .map_err(|object| SerializerError::TypeMismatch {
                expected: type_name::<T>(),
                found: object.type_name(),
            })
    }

    /// Writes only the body of `value`. No registration needed.
    pub fn serialize_direct<T: Serialize + ?Sized>(
        &self,
        value: &T,
    ) -> Result<Vec<u8>, SerializerError> {
        let bytes = to_vec(value, self.strings()?)?;
        self.serialized.record(bytes.len());
        Ok(bytes)
    }

    /// Decodes a body written by [`serialize_direct`](Self::serialize_direct).
    pub fn deserialize_direct<T: DeserializeOwned>(
        &self,
        bytes: &[u8],
    ) -> Result<T, SerializerError> {
        let value = from_slice_with_max_depth(bytes, self.strings()?, self.max_depth)?;
        self.deserialized.record(bytes.len());
        Ok(value)
    }

    pub fn stats(&self) -> SerializerStatsSnapshot {
        let load = |counter: &AtomicU64| counter.load(Ordering::Relaxed);
        SerializerStatsSnapshot {
            objects_serialized: load(&self.serialized.objects),
            bytes_serialized: load(&self.serialized.bytes),
            largest_serialized: load(&self.serialized.largest),
            objects_deserialized: load(&self.deserialized.objects),
            bytes_deserialized: load(&self.deserialized.bytes),
            largest_deserialized: load(&self.deserialized.largest),
        }
    }
}

impl fmt::Debug for BinarySerializer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BinarySerializer")
            .field("table", &self.table)
            .field("strings_locked", &self.dict.is_locked())
            .finish_non_exhaustive()
    }
}
