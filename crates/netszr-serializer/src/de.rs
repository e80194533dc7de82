//! serde `Deserializer` for the netszr wire format.
//!
//! The format carries no type information, so every value is read as the
//! type the caller asks for. `deserialize_any` and `deserialize_ignored_any`
//! are unsupported.
//!
//! Every struct, tuple, sequence, map, option and enum counts as one level
//! of nesting. Input nested deeper than the configured limit (default
//! [`DEFAULT_MAX_DEPTH`]) is rejected before the stack can run out.
//!
//! Strings are read with the mapped string codec, but serde never sees
//! its null marker: an `Option<String>` carries serde's own option tag,
//! and a null marker where a string is expected is an error. The null
//! marker belongs to callers of
//! [`MappedStrings::read_mapped_string`] that work below serde.

use netszr_strings::MappedStrings;
use netszr_wire::{WireDecode, WireError, WireReader};
use serde::de::value::U32Deserializer;
use serde::de::{
    self, DeserializeOwned, DeserializeSeed, EnumAccess, IntoDeserializer, MapAccess, SeqAccess,
    VariantAccess, Visitor,
};

use crate::SerializerError;

/// Reads values from a [`WireReader`], resolving mapped strings through
/// the string table.
pub struct WireDeserializer<'a, 'de> {
    r: &'a mut WireReader<'de>,
    strings: &'a MappedStrings,
    depth: usize,
    max_depth: usize,
}

/// Nesting limit used by [`from_slice`] and [`WireDeserializer::new`].
pub const DEFAULT_MAX_DEPTH: usize = 128;

impl<'a, 'de> WireDeserializer<'a, 'de> {
    pub fn new(r: &'a mut WireReader<'de>, strings: &'a MappedStrings) -> Self {
        Self::with_max_depth(r, strings, DEFAULT_MAX_DEPTH)
    }

    pub fn with_max_depth(
        r: &'a mut WireReader<'de>,
        strings: &'a MappedStrings,
        max_depth: usize,
    ) -> Self {
        Self {
            r,
            strings,
            depth: 0,
            max_depth,
        }
    }

    /// Runs `f` one nesting level deeper.
    fn nested<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, SerializerError>,
    ) -> Result<T, SerializerError> {
        if self.depth >= self.max_depth {
            return Err(SerializerError::DepthLimitExceeded(self.max_depth));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    fn read_string(&mut self) -> Result<String, SerializerError> {
        self.strings
            .read_mapped_string(self.r)?
            .ok_or_else(|| SerializerError::Message("null where a string was expected".into()))
    }

    fn read_option_tag(&mut self) -> Result<bool, SerializerError> {
        match self.r.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(WireError::InvalidValue(format!("option tag must be 0 or 1, got {other}")).into()),
        }
    }
}

/// Deserializes a value, requiring the whole input to be consumed.
pub fn from_slice<T: DeserializeOwned>(
    bytes: &[u8],
    strings: &MappedStrings,
) -> Result<T, SerializerError> {
    from_slice_with_max_depth(bytes, strings, DEFAULT_MAX_DEPTH)
}

/// [`from_slice`] with an explicit nesting limit.
pub fn from_slice_with_max_depth<T: DeserializeOwned>(
    bytes: &[u8],
    strings: &MappedStrings,
    max_depth: usize,
) -> Result<T, SerializerError> {
    let mut r = WireReader::new(bytes);
    let value = T::deserialize(&mut WireDeserializer::with_max_depth(&mut r, strings, max_depth))?;
    r.finish()?;
    Ok(value)
}

macro_rules! decode_primitive {
    ($($method:ident => $ty:ty, $visit:ident;)*) => {$(
        fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, SerializerError> {
            visitor.$visit(<$ty>::decode(self.r)?)
        }
    )*};
}

impl<'de> de::Deserializer<'de> for &mut WireDeserializer<'_, 'de> {
    type Error = SerializerError;

    fn deserialize_any<V: Visitor<'de>>(self, _visitor: V) -> Result<V::Value, SerializerError> {
        Err(SerializerError::Unsupported("deserialize_any"))
    }

    decode_primitive! {
        deserialize_bool => bool, visit_bool;
        deserialize_i8 => i8, visit_i8;
        deserialize_i16 => i16, visit_i16;
        deserialize_i32 => i32, visit_i32;
        deserialize_i64 => i64, visit_i64;
        deserialize_u8 => u8, visit_u8;
        deserialize_u16 => u16, visit_u16;
        deserialize_u32 => u32, visit_u32;
        deserialize_u64 => u64, visit_u64;
        deserialize_f32 => f32, visit_f32;
        deserialize_f64 => f64, visit_f64;
    }

    fn deserialize_char<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, SerializerError> {
        let raw = self.r.read_varint()?;
        let c = u32::try_from(raw)
            .ok()
            .and_then(char::from_u32)
            .ok_or(WireError::InvalidChar(raw))?;
        visitor.visit_char(c)
    }

    fn deserialize_str<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, SerializerError> {
        visitor.visit_string(self.read_string()?)
    }

    fn deserialize_string<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, SerializerError> {
        visitor.visit_string(self.read_string()?)
    }

    fn deserialize_bytes<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, SerializerError> {
        visitor.visit_borrowed_bytes(self.r.read_len_prefixed()?)
    }

    fn deserialize_byte_buf<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, SerializerError> {
        visitor.visit_byte_buf(self.r.read_len_prefixed()?.to_vec())
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, SerializerError> {
        if self.read_option_tag()? {
            self.nested(|de| visitor.visit_some(de))
        } else {
            visitor.visit_none()
        }
    }

    fn deserialize_unit<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, SerializerError> {
        visitor.visit_unit()
    }

    fn deserialize_unit_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, SerializerError> {
        visitor.visit_unit()
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, SerializerError> {
        self.nested(|de| visitor.visit_newtype_struct(de))
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, SerializerError> {
        // Bounded by the remaining input before any element is read.
        let len = self.r.read_len()?;
        self.nested(|de| visitor.visit_seq(Counted { de, left: len }))
    }

    fn deserialize_tuple<V: Visitor<'de>>(
        self,
        len: usize,
        visitor: V,
    ) -> Result<V::Value, SerializerError> {
        self.nested(|de| visitor.visit_seq(Counted { de, left: len }))
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        len: usize,
        visitor: V,
    ) -> Result<V::Value, SerializerError> {
        self.nested(|de| visitor.visit_seq(Counted { de, left: len }))
    }

    fn deserialize_map<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, SerializerError> {
        let len = self.r.read_len()?;
        self.nested(|de| visitor.visit_map(Counted { de, left: len }))
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, SerializerError> {
        self.nested(|de| {
            visitor.visit_seq(Counted {
                de,
                left: fields.len(),
            })
        })
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, SerializerError> {
        self.nested(|de| visitor.visit_enum(de))
    }

    fn deserialize_identifier<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, SerializerError> {
        visitor.visit_u32(self.r.read_varint_u32()?)
    }

    fn deserialize_ignored_any<V: Visitor<'de>>(self, _visitor: V) -> Result<V::Value, SerializerError> {
        Err(SerializerError::Unsupported("deserialize_ignored_any"))
    }

    fn is_human_readable(&self) -> bool {
        false
    }
}

/// Sequence, tuple, struct or map access over a known element count.
struct Counted<'r, 'a, 'de> {
    de: &'r mut WireDeserializer<'a, 'de>,
    left: usize,
}

impl<'de> SeqAccess<'de> for Counted<'_, '_, 'de> {
    type Error = SerializerError;

    fn next_element_seed<T: DeserializeSeed<'de>>(
        &mut self,
        seed: T,
    ) -> Result<Option<T::Value>, SerializerError> {
        if self.left == 0 {
            return Ok(None);
        }
        self.left -= 1;
        seed.deserialize(&mut *self.de).map(Some)
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.left)
    }
}

impl<'de> MapAccess<'de> for Counted<'_, '_, 'de> {
    type Error = SerializerError;

    fn next_key_seed<K: DeserializeSeed<'de>>(
        &mut self,
        seed: K,
    ) -> Result<Option<K::Value>, SerializerError> {
        if self.left == 0 {
            return Ok(None);
        }
        self.left -= 1;
        seed.deserialize(&mut *self.de).map(Some)
    }

    fn next_value_seed<V: DeserializeSeed<'de>>(
        &mut self,
        seed: V,
    ) -> Result<V::Value, SerializerError> {
        seed.deserialize(&mut *self.de)
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.left)
    }
}

impl<'de> EnumAccess<'de> for &mut WireDeserializer<'_, 'de> {
    type Error = SerializerError;
    type Variant = Self;

    fn variant_seed<V: DeserializeSeed<'de>>(
        self,
        seed: V,
    ) -> Result<(V::Value, Self), SerializerError> {
        let index = self.r.read_varint_u32()?;
        let variant: U32Deserializer<SerializerError> = index.into_deserializer();
        let value = seed.deserialize(variant)?;
        Ok((value, self))
    }
}

impl<'de> VariantAccess<'de> for &mut WireDeserializer<'_, 'de> {
    type Error = SerializerError;

    fn unit_variant(self) -> Result<(), SerializerError> {
        Ok(())
    }

    fn newtype_variant_seed<T: DeserializeSeed<'de>>(
        self,
        seed: T,
    ) -> Result<T::Value, SerializerError> {
        seed.deserialize(self)
    }

    fn tuple_variant<V: Visitor<'de>>(
        self,
        len: usize,
        visitor: V,
    ) -> Result<V::Value, SerializerError> {
        visitor.visit_seq(Counted { de: self, left: len })
    }

    fn struct_variant<V: Visitor<'de>>(
        self,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, SerializerError> {
        visitor.visit_seq(Counted {
            de: self,
            left: fields.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::to_vec;
    use netszr_strings::MappedStringDict;
    use serde::{Deserialize, Serialize};
    use std::collections::BTreeMap;
    use std::sync::Arc;

    fn strings() -> Arc<MappedStrings> {
        let dict = MappedStringDict::default();
        dict.add_strings(["textures/metal_wall", "SteelFloorTile"], "test")
            .unwrap();
        dict.finalize().unwrap()
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    enum Command {
        Stop,
        Move(f32, f32),
        Say { text: String, loud: bool },
        Spawn(Box<Entity>),
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Entity {
        prototype: String,
        tags: Vec<String>,
        health: Option<u16>,
        offset: (i8, i8),
        components: BTreeMap<String, i64>,
    }

    #[test]
    fn test_nested_roundtrip() {
        let t = strings();
        let value = vec![
            Command::Stop,
            Command::Move(1.5, -2.0),
            Command::Say {
                text: "metal".into(),
                loud: true,
            },
            Command::Spawn(Box::new(Entity {
                prototype: "SteelFloorTile".into(),
                tags: vec!["wall".into(), "never mapped".into()],
                health: Some(100),
                offset: (-1, 1),
                components: [("Sprite".to_string(), 3), ("Physics".to_string(), -7)]
                    .into_iter()
                    .collect(),
            })),
        ];

        let bytes = to_vec(&value, &t).unwrap();
        let back: Vec<Command> = from_slice(&bytes, &t).unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn test_nan_reads_back_as_zero() {
        let t = strings();
        let bytes = to_vec(&(f32::NAN, f64::NAN), &t).unwrap();
        let (a, b): (f32, f64) = from_slice(&bytes, &t).unwrap();
        assert_eq!(a, 0.0);
        assert_eq!(b, 0.0);
    }

    #[test]
    fn test_unknown_variant_index_is_error() {
        let t = strings();
        assert!(from_slice::<Command>(&[9], &t).is_err());
    }

    #[test]
    fn test_seq_length_beyond_input_is_rejected() {
        let t = strings();
        // Claims 10_000 elements with three bytes behind it.
        let bytes = [0x90, 0x4e, 1, 2, 3];
        assert!(matches!(
            from_slice::<Vec<u8>>(&bytes, &t),
            Err(SerializerError::Wire(WireError::LengthTooLarge { .. }))
        ));
    }

    #[test]
    fn test_trailing_bytes_are_rejected() {
        let t = strings();
        assert!(matches!(
            from_slice::<u8>(&[1, 2], &t),
            Err(SerializerError::Wire(WireError::TrailingBytes(1)))
        ));
    }

    #[test]
    fn test_truncated_struct_is_error() {
        let t = strings();
        let bytes = to_vec(&(5u32, 6u32, 7u32), &t).unwrap();
        assert!(from_slice::<(u32, u32, u32)>(&bytes[..2], &t).is_err());
    }

    #[test]
    fn test_invalid_char_is_rejected() {
        let t = strings();
        // 0xD800 is a surrogate.
        let bytes = to_vec(&0xD800u32, &t).unwrap();
        assert!(matches!(
            from_slice::<char>(&bytes, &t),
            Err(SerializerError::Wire(WireError::InvalidChar(0xD800)))
        ));
    }

    #[derive(Debug, Deserialize)]
    enum Tree {
        Leaf,
        Node(Box<Tree>),
    }

    #[test]
    fn test_deep_nesting_is_rejected() {
        let t = strings();
        // Every 1 opens another `Node`.
        let bytes = vec![1u8; 1 << 20];
        assert!(matches!(
            from_slice::<Tree>(&bytes, &t),
            Err(SerializerError::DepthLimitExceeded(DEFAULT_MAX_DEPTH))
        ));
    }

    #[test]
    fn test_nesting_at_limit_decodes() {
        let t = strings();
        // Ten nodes and a leaf: eleven levels.
        let mut bytes = vec![1u8; 10];
        bytes.push(0);
        assert!(from_slice_with_max_depth::<Tree>(&bytes, &t, 11).is_ok());
        assert!(matches!(
            from_slice_with_max_depth::<Tree>(&bytes, &t, 10),
            Err(SerializerError::DepthLimitExceeded(10))
        ));
    }

    #[test]
    fn test_null_string_marker_is_rejected() {
        let t = strings();
        assert!(matches!(
            from_slice::<String>(&[0], &t),
            Err(SerializerError::Message(_))
        ));
    }

    #[test]
    fn test_option_string_uses_option_tag() {
        let t = strings();
        assert_eq!(to_vec(&None::<String>, &t).unwrap(), vec![0]);
        assert_eq!(
            to_vec(&Some("xy".to_string()), &t).unwrap(),
            vec![1, 1, 2, b'x', b'y']
        );
        assert_eq!(from_slice::<Option<String>>(&[0], &t).unwrap(), None);
    }

    #[test]
    fn test_deserialize_any_is_unsupported() {
        let t = strings();
        assert!(matches!(
            from_slice::<serde_json::Value>(&[0], &t),
            Err(SerializerError::Unsupported("deserialize_any"))
        ));
    }
}
