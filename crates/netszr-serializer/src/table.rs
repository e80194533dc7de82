//! The type table: a closed set of serializable types with dense ids.
//!
//! Ids are assigned by sorting wire names, so two processes that register
//! the same set of types (in any order) agree on every id. Each entry
//! carries a type-erased encode/decode pair; structural types go through
//! serde, while primitives, math types and anything a collaborator hands
//! in through [`TypeTableBuilder::register_custom`] use explicit codecs.

use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;

use glam::{Affine2, Mat4, Quat, Vec2, Vec3, Vec4};
use half::f16;
use netszr_strings::MappedStrings;
use netszr_wire::{LegacyBitArray, WireDecode, WireEncode, WireReader, WireWriter};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::{SerializerError, WireDeserializer, WireSerializer};

/// A type that can travel through a [`BinarySerializer`](crate::BinarySerializer).
///
/// The wire name identifies the type on both peers and decides its id, so
/// it must be stable across builds and unique within the table.
///
/// ```rust
/// use netszr_serializer::NetSerializable;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize, Deserialize)]
/// struct SpawnEntity {
///     prototype: String,
///     position: (f32, f32),
/// }
///
/// impl NetSerializable for SpawnEntity {
///     const WIRE_NAME: &'static str = "SpawnEntity";
/// }
/// ```
pub trait NetSerializable: Serialize + DeserializeOwned + Send + 'static {
    const WIRE_NAME: &'static str;
}

type EncodeFn =
    Box<dyn Fn(&dyn Any, &mut WireWriter, &MappedStrings) -> Result<(), SerializerError> + Send + Sync>;
/// Decoders receive the nesting limit; custom codecs may ignore it.
type DecodeFn = Box<
    dyn Fn(&mut WireReader<'_>, &MappedStrings, usize) -> Result<Box<dyn Any + Send>, SerializerError>
        + Send
        + Sync,
>;

/// One registered type.
pub(crate) struct TypeEntry {
    pub(crate) name: &'static str,
    pub(crate) type_name: &'static str,
    type_id: TypeId,
    encode: EncodeFn,
    decode: DecodeFn,
}

impl TypeEntry {
    pub(crate) fn encode(
        &self,
        value: &dyn Any,
        w: &mut WireWriter,
        strings: &MappedStrings,
    ) -> Result<(), SerializerError> {
        (self.encode)(value, w, strings)
    }

    pub(crate) fn decode(
        &self,
        r: &mut WireReader<'_>,
        strings: &MappedStrings,
        max_depth: usize,
    ) -> Result<Box<dyn Any + Send>, SerializerError> {
        (self.decode)(r, strings, max_depth)
    }
}

fn downcast<T: 'static>(value: &dyn Any) -> Result<&T, SerializerError> {
    value
        .downcast_ref::<T>()
        .ok_or(SerializerError::TypeMismatch {
            expected: type_name::<T>(),
            found: "a value of another type",
        })
}

fn serde_encode<T: Serialize + 'static>(
    value: &dyn Any,
    w: &mut WireWriter,
    strings: &MappedStrings,
) -> Result<(), SerializerError> {
    downcast::<T>(value)?.serialize(&mut WireSerializer::new(w, strings))
}

fn serde_decode<T: DeserializeOwned + Send + 'static>(
    r: &mut WireReader<'_>,
    strings: &MappedStrings,
    max_depth: usize,
) -> Result<Box<dyn Any + Send>, SerializerError> {
    let value = T::deserialize(&mut WireDeserializer::with_max_depth(r, strings, max_depth))?;
    Ok(Box::new(value))
}

fn wire_encode<T: WireEncode>(
    value: &T,
    w: &mut WireWriter,
    _strings: &MappedStrings,
) -> Result<(), SerializerError> {
    value.encode(w);
    Ok(())
}

fn wire_decode<T: WireDecode>(
    r: &mut WireReader<'_>,
    _strings: &MappedStrings,
) -> Result<T, SerializerError> {
    Ok(T::decode(r)?)
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Collects registrations and freezes them into a [`TypeTable`].
///
/// [`TypeTableBuilder::new`] starts with the built-in types already
/// registered:
///
/// | wire name          | type                           |
/// |--------------------|--------------------------------|
/// | `bool`             | `bool`                         |
/// | `u8` .. `u64`      | unsigned integers              |
/// | `i8` .. `i64`      | signed integers                |
/// | `f16`, `f32`, `f64`| floats (NaN reads back as 0)   |
/// | `string`           | `String` (mapped)              |
/// | `bytes`            | `Vec<u8>`                      |
/// | `vec2` .. `vec4`   | `glam::Vec2` .. `glam::Vec4`   |
/// | `quat`             | `glam::Quat`                   |
/// | `affine2`          | `glam::Affine2`                |
/// | `mat4`             | `glam::Mat4`                   |
/// | `legacy_bit_array` | [`LegacyBitArray`]             |
pub struct TypeTableBuilder {
    pending: Vec<TypeEntry>,
}

impl TypeTableBuilder {
    pub fn new() -> Self {
        Self {
            pending: Vec::new(),
        }
        .with_serde::<bool>("bool")
        .with_serde::<u8>("u8")
        .with_serde::<u16>("u16")
        .with_serde::<u32>("u32")
        .with_serde::<u64>("u64")
        .with_serde::<i8>("i8")
        .with_serde::<i16>("i16")
        .with_serde::<i32>("i32")
        .with_serde::<i64>("i64")
        .with_serde::<f32>("f32")
        .with_serde::<f64>("f64")
        .with_serde::<String>("string")
        .register_custom::<f16>("f16", wire_encode, wire_decode)
        .register_custom::<Vec<u8>>(
            "bytes",
            |bytes, w, _| {
                w.write_len_prefixed(bytes);
                Ok(())
            },
            |r, _| Ok(r.read_len_prefixed()?.to_vec()),
        )
        .register_custom::<Vec2>("vec2", wire_encode, wire_decode)
        .register_custom::<Vec3>("vec3", wire_encode, wire_decode)
        .register_custom::<Vec4>("vec4", wire_encode, wire_decode)
        .register_custom::<Quat>("quat", wire_encode, wire_decode)
        .register_custom::<Affine2>("affine2", wire_encode, wire_decode)
        .register_custom::<Mat4>("mat4", wire_encode, wire_decode)
        .register_custom::<LegacyBitArray>("legacy_bit_array", wire_encode, wire_decode)
    }

    /// Registers a serde type under its [`NetSerializable::WIRE_NAME`].
    pub fn register<T: NetSerializable>(self) -> Self {
        self.with_serde::<T>(T::WIRE_NAME)
    }

    /// Registers a type with an explicit codec pair.
    ///
    /// This is the seam for types whose layout is fixed outside serde.
    /// The decoder must consume exactly what the encoder wrote.
    pub fn register_custom<T: Send + 'static>(
        mut self,
        name: &'static str,
        encode: fn(&T, &mut WireWriter, &MappedStrings) -> Result<(), SerializerError>,
        decode: fn(&mut WireReader<'_>, &MappedStrings) -> Result<T, SerializerError>,
    ) -> Self {
        let encode: EncodeFn = Box::new(move |value, w, strings| encode(downcast::<T>(value)?, w, strings));
        let decode: DecodeFn = Box::new(move |r, strings, _max_depth| {
            let value: Box<dyn Any + Send> = Box::new(decode(r, strings)?);
            Ok(value)
        });
        self.pending.push(TypeEntry {
            name,
            type_name: type_name::<T>(),
            type_id: TypeId::of::<T>(),
            encode,
            decode,
        });
        self
    }

    fn with_serde<T: Serialize + DeserializeOwned + Send + 'static>(
        mut self,
        name: &'static str,
    ) -> Self {
        self.pending.push(TypeEntry {
            name,
            type_name: type_name::<T>(),
            type_id: TypeId::of::<T>(),
            encode: Box::new(serde_encode::<T>),
            decode: Box::new(serde_decode::<T>),
        });
        self
    }

    /// Assigns ids and freezes the table.
    ///
    /// # Errors
    /// [`SerializerError::DuplicateName`] if two registrations share a wire
    /// name, [`SerializerError::DuplicateType`] if one Rust type was
    /// registered twice.
    pub fn build(mut self) -> Result<TypeTable, SerializerError> {
        self.pending.sort_by(|a, b| a.name.cmp(b.name));

        if let Some(pair) = self.pending.windows(2).find(|pair| pair[0].name == pair[1].name) {
            return Err(SerializerError::DuplicateName(pair[0].name.to_owned()));
        }

        let mut by_type = HashMap::with_capacity(self.pending.len());
        for (id, entry) in self.pending.iter().enumerate() {
            let id = u32::try_from(id)
                .map_err(|_| SerializerError::Message("too many registered types".into()))?;
            if by_type.insert(entry.type_id, id).is_some() {
                return Err(SerializerError::DuplicateType(entry.type_name));
            }
        }

        let mut hasher = blake3::Hasher::new();
        for (id, entry) in self.pending.iter().enumerate() {
            hasher.update(&(id as u64).to_le_bytes());
            hasher.update(&(entry.name.len() as u64).to_le_bytes());
            hasher.update(entry.name.as_bytes());
        }

        Ok(TypeTable {
            entries: self.pending,
            by_type,
            fingerprint: hasher.finalize(),
        })
    }
}

impl Default for TypeTableBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Table
// ---------------------------------------------------------------------------

/// Frozen bijection between registered types and ids.
pub struct TypeTable {
    entries: Vec<TypeEntry>,
    by_type: HashMap<TypeId, u32>,
    fingerprint: blake3::Hash,
}

impl TypeTable {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn id_of<T: 'static>(&self) -> Option<u32> {
        self.id_of_type(TypeId::of::<T>())
    }

    pub fn id_of_type(&self, type_id: TypeId) -> Option<u32> {
        self.by_type.get(&type_id).copied()
    }

    /// Wire name registered under `id`.
    pub fn name(&self, id: u32) -> Option<&'static str> {
        self.entry(u64::from(id)).map(|entry| entry.name)
    }

    /// Wire names in id order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|entry| entry.name)
    }

    /// blake3 over the ordered `(id, name)` list.
    pub fn fingerprint(&self) -> blake3::Hash {
        self.fingerprint
    }

    /// Fails unless `remote` is the fingerprint of an identical table.
    pub fn verify_fingerprint(&self, remote: &[u8]) -> Result<(), SerializerError> {
        if remote == self.fingerprint.as_bytes().as_slice() {
            return Ok(());
        }
        Err(SerializerError::TypeTableMismatch {
            local: self.fingerprint.to_hex().to_string(),
            remote: remote.iter().map(|b| format!("{b:02x}")).collect(),
        })
    }

    pub(crate) fn entry(&self, id: u64) -> Option<&TypeEntry> {
        usize::try_from(id).ok().and_then(|i| self.entries.get(i))
    }
}

impl std::fmt::Debug for TypeTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeTable")
            .field("types", &self.entries.len())
            .field("fingerprint", &self.fingerprint.to_hex())
            .finish()
    }
}
