//! `WireEncode` / `WireDecode` and their primitive implementations.

use half::f16;

use crate::{WireError, WireReader, WireWriter};

/// A value with a fixed, self-contained wire encoding.
pub trait WireEncode {
    fn encode(&self, w: &mut WireWriter);
}

/// A value that can be decoded from the layout its [`WireEncode`] writes.
pub trait WireDecode: Sized {
    fn decode(r: &mut WireReader<'_>) -> Result<Self, WireError>;
}

/// Encodes a single value into a fresh buffer.
pub fn to_bytes<T: WireEncode + ?Sized>(value: &T) -> Vec<u8> {
    let mut w = WireWriter::new();
    value.encode(&mut w);
    w.into_bytes()
}

/// Decodes a single value, requiring the whole input to be consumed.
pub fn from_bytes<T: WireDecode>(bytes: &[u8]) -> Result<T, WireError> {
    let mut r = WireReader::new(bytes);
    let value = T::decode(&mut r)?;
    r.finish()?;
    Ok(value)
}

impl WireEncode for bool {
    fn encode(&self, w: &mut WireWriter) {
        w.write_u8(u8::from(*self));
    }
}

impl WireDecode for bool {
    fn decode(r: &mut WireReader<'_>) -> Result<Self, WireError> {
        match r.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(WireError::InvalidBool(other)),
        }
    }
}

impl WireEncode for u8 {
    fn encode(&self, w: &mut WireWriter) {
        w.write_u8(*self);
    }
}

impl WireDecode for u8 {
    fn decode(r: &mut WireReader<'_>) -> Result<Self, WireError> {
        r.read_u8()
    }
}

macro_rules! impl_unsigned {
    ($($ty:ty),*) => {$(
        impl WireEncode for $ty {
            fn encode(&self, w: &mut WireWriter) {
                w.write_varint(u64::from(*self));
            }
        }

        impl WireDecode for $ty {
            fn decode(r: &mut WireReader<'_>) -> Result<Self, WireError> {
                <$ty>::try_from(r.read_varint()?)
                    .map_err(|_| WireError::VarintOverflow(stringify!($ty)))
            }
        }
    )*};
}

macro_rules! impl_signed {
    ($($ty:ty),*) => {$(
        impl WireEncode for $ty {
            fn encode(&self, w: &mut WireWriter) {
                w.write_zigzag(i64::from(*self));
            }
        }

        impl WireDecode for $ty {
            fn decode(r: &mut WireReader<'_>) -> Result<Self, WireError> {
                <$ty>::try_from(r.read_zigzag()?)
                    .map_err(|_| WireError::VarintOverflow(stringify!($ty)))
            }
        }
    )*};
}

impl_unsigned!(u16, u32, u64);
impl_signed!(i8, i16, i32, i64);

impl WireEncode for f32 {
    fn encode(&self, w: &mut WireWriter) {
        w.write_f32(*self);
    }
}

impl WireDecode for f32 {
    fn decode(r: &mut WireReader<'_>) -> Result<Self, WireError> {
        r.read_f32()
    }
}

impl WireEncode for f64 {
    fn encode(&self, w: &mut WireWriter) {
        w.write_f64(*self);
    }
}

impl WireDecode for f64 {
    fn decode(r: &mut WireReader<'_>) -> Result<Self, WireError> {
        r.read_f64()
    }
}

/// Half floats travel as their raw 16 bits, little-endian.
impl WireEncode for f16 {
    fn encode(&self, w: &mut WireWriter) {
        w.write_raw(&self.to_bits().to_le_bytes());
    }
}

impl WireDecode for f16 {
    fn decode(r: &mut WireReader<'_>) -> Result<Self, WireError> {
        Ok(f16_from_bits(r.read_u16_le()?))
    }
}

/// NaN bit patterns read as zero.
pub(crate) fn f16_from_bits(bits: u16) -> f16 {
    let value = f16::from_bits(bits);
    if value.is_nan() { f16::ZERO } else { value }
}

/// Raw (unmapped) string: varint byte length then UTF-8.
impl WireEncode for str {
    fn encode(&self, w: &mut WireWriter) {
        w.write_len_prefixed(self.as_bytes());
    }
}

impl WireEncode for String {
    fn encode(&self, w: &mut WireWriter) {
        self.as_str().encode(w);
    }
}

impl WireDecode for String {
    fn decode(r: &mut WireReader<'_>) -> Result<Self, WireError> {
        r.read_str().map(str::to_owned)
    }
}

impl<T: WireEncode> WireEncode for Option<T> {
    fn encode(&self, w: &mut WireWriter) {
        match self {
            None => w.write_u8(0),
            Some(value) => {
                w.write_u8(1);
                value.encode(w);
            }
        }
    }
}

impl<T: WireDecode> WireDecode for Option<T> {
    fn decode(r: &mut WireReader<'_>) -> Result<Self, WireError> {
        match r.read_u8()? {
            0 => Ok(None),
            1 => T::decode(r).map(Some),
            other => Err(WireError::InvalidValue(format!(
                "option tag must be 0 or 1, got {other}"
            ))),
        }
    }
}
