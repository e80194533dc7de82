//! serde `Serializer` that writes the netszr wire format.
//!
//! | serde type              | wire                                        |
//! |-------------------------|---------------------------------------------|
//! | bool                    | 1 byte                                      |
//! | u8                      | 1 byte                                      |
//! | u16 / u32 / u64         | varint                                      |
//! | i8 .. i64               | zigzag varint                               |
//! | f32 / f64               | little-endian IEEE                          |
//! | char                    | varint scalar value                         |
//! | str                     | mapped string                               |
//! | bytes                   | varint length + raw                         |
//! | Option                  | tag byte 0 / 1, then value                  |
//! | unit, unit struct       | nothing                                     |
//! | newtype struct          | the inner value                             |
//! | seq, map                | varint length, then elements                |
//! | tuple, struct           | fields in order, no length                  |
//! | enum                    | varint variant index, then payload          |

use netszr_strings::MappedStrings;
use netszr_wire::WireWriter;
use serde::Serialize;
use serde::ser;

use crate::SerializerError;

/// Writes values into a [`WireWriter`], sending strings through the
/// mapped string table.
pub struct WireSerializer<'a> {
    w: &'a mut WireWriter,
    strings: &'a MappedStrings,
}

impl<'a> WireSerializer<'a> {
    pub fn new(w: &'a mut WireWriter, strings: &'a MappedStrings) -> Self {
        Self { w, strings }
    }
}

/// Serializes `value` into a fresh buffer.
pub fn to_vec<T: Serialize + ?Sized>(
    value: &T,
    strings: &MappedStrings,
) -> Result<Vec<u8>, SerializerError> {
    let mut w = WireWriter::new();
    value.serialize(&mut WireSerializer::new(&mut w, strings))?;
    Ok(w.into_bytes())
}

impl<'a, 'b> ser::Serializer for &'b mut WireSerializer<'a> {
    type Ok = ();
    type Error = SerializerError;

    type SerializeSeq = Self;
    type SerializeTuple = Self;
    type SerializeTupleStruct = Self;
    type SerializeTupleVariant = Self;
    type SerializeMap = Self;
    type SerializeStruct = Self;
    type SerializeStructVariant = Self;

    fn serialize_bool(self, v: bool) -> Result<(), SerializerError> {
        self.w.write_u8(u8::from(v));
        Ok(())
    }

    fn serialize_i8(self, v: i8) -> Result<(), SerializerError> {
        self.serialize_i64(i64::from(v))
    }

    fn serialize_i16(self, v: i16) -> Result<(), SerializerError> {
        self.serialize_i64(i64::from(v))
    }

    fn serialize_i32(self, v: i32) -> Result<(), SerializerError> {
        self.serialize_i64(i64::from(v))
    }

    fn serialize_i64(self, v: i64) -> Result<(), SerializerError> {
        self.w.write_zigzag(v);
        Ok(())
    }

    fn serialize_u8(self, v: u8) -> Result<(), SerializerError> {
        self.w.write_u8(v);
        Ok(())
    }

    fn serialize_u16(self, v: u16) -> Result<(), SerializerError> {
        self.serialize_u64(u64::from(v))
    }

    fn serialize_u32(self, v: u32) -> Result<(), SerializerError> {
        self.serialize_u64(u64::from(v))
    }

    fn serialize_u64(self, v: u64) -> Result<(), SerializerError> {
        self.w.write_varint(v);
        Ok(())
    }

    fn serialize_f32(self, v: f32) -> Result<(), SerializerError> {
        self.w.write_f32(v);
        Ok(())
    }

    fn serialize_f64(self, v: f64) -> Result<(), SerializerError> {
        self.w.write_f64(v);
        Ok(())
    }

    fn serialize_char(self, v: char) -> Result<(), SerializerError> {
        self.serialize_u64(u64::from(u32::from(v)))
    }

    fn serialize_str(self, v: &str) -> Result<(), SerializerError> {
        self.strings.write_mapped_string(self.w, Some(v));
        Ok(())
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<(), SerializerError> {
        self.w.write_len_prefixed(v);
        Ok(())
    }

    fn serialize_none(self) -> Result<(), SerializerError> {
        self.w.write_u8(0);
        Ok(())
    }

    fn serialize_some<T: Serialize + ?Sized>(self, value: &T) -> Result<(), SerializerError> {
        self.w.write_u8(1);
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<(), SerializerError> {
        Ok(())
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<(), SerializerError> {
        Ok(())
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        variant_index: u32,
        _variant: &'static str,
    ) -> Result<(), SerializerError> {
        self.serialize_u32(variant_index)
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<(), SerializerError> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        variant_index: u32,
        _variant: &'static str,
        value: &T,
    ) -> Result<(), SerializerError> {
        self.w.write_varint(u64::from(variant_index));
        value.serialize(self)
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<Self, SerializerError> {
        let len = len.ok_or(SerializerError::LengthRequired)?;
        self.w.write_varint(len as u64);
        Ok(self)
    }

    fn serialize_tuple(self, _len: usize) -> Result<Self, SerializerError> {
        Ok(self)
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self, SerializerError> {
        Ok(self)
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self, SerializerError> {
        self.w.write_varint(u64::from(variant_index));
        Ok(self)
    }

    fn serialize_map(self, len: Option<usize>) -> Result<Self, SerializerError> {
        let len = len.ok_or(SerializerError::LengthRequired)?;
        self.w.write_varint(len as u64);
        Ok(self)
    }

    fn serialize_struct(self, _name: &'static str, _len: usize) -> Result<Self, SerializerError> {
        Ok(self)
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self, SerializerError> {
        self.w.write_varint(u64::from(variant_index));
        Ok(self)
    }

    fn is_human_readable(&self) -> bool {
        false
    }
}

impl<'a, 'b> ser::SerializeSeq for &'b mut WireSerializer<'a> {
    type Ok = ();
    type Error = SerializerError;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), SerializerError> {
        value.serialize(&mut **self)
    }

    fn end(self) -> Result<(), SerializerError> {
        Ok(())
    }
}

impl<'a, 'b> ser::SerializeTuple for &'b mut WireSerializer<'a> {
    type Ok = ();
    type Error = SerializerError;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), SerializerError> {
        value.serialize(&mut **self)
    }

    fn end(self) -> Result<(), SerializerError> {
        Ok(())
    }
}

impl<'a, 'b> ser::SerializeTupleStruct for &'b mut WireSerializer<'a> {
    type Ok = ();
    type Error = SerializerError;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), SerializerError> {
        value.serialize(&mut **self)
    }

    fn end(self) -> Result<(), SerializerError> {
        Ok(())
    }
}

impl<'a, 'b> ser::SerializeTupleVariant for &'b mut WireSerializer<'a> {
    type Ok = ();
    type Error = SerializerError;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), SerializerError> {
        value.serialize(&mut **self)
    }

    fn end(self) -> Result<(), SerializerError> {
        Ok(())
    }
}

impl<'a, 'b> ser::SerializeMap for &'b mut WireSerializer<'a> {
    type Ok = ();
    type Error = SerializerError;

    fn serialize_key<T: Serialize + ?Sized>(&mut self, key: &T) -> Result<(), SerializerError> {
        key.serialize(&mut **self)
    }

    fn serialize_value<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), SerializerError> {
        value.serialize(&mut **self)
    }

    fn end(self) -> Result<(), SerializerError> {
        Ok(())
    }
}

impl<'a, 'b> ser::SerializeStruct for &'b mut WireSerializer<'a> {
    type Ok = ();
    type Error = SerializerError;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        _key: &'static str,
        value: &T,
    ) -> Result<(), SerializerError> {
        value.serialize(&mut **self)
    }

    fn end(self) -> Result<(), SerializerError> {
        Ok(())
    }
}

impl<'a, 'b> ser::SerializeStructVariant for &'b mut WireSerializer<'a> {
    type Ok = ();
    type Error = SerializerError;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        _key: &'static str,
        value: &T,
    ) -> Result<(), SerializerError> {
        value.serialize(&mut **self)
    }

    fn end(self) -> Result<(), SerializerError> {
        Ok(())
    }
}
