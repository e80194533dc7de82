//! Property tests for the primitive codecs.
//!
//! Decoders must survive arbitrary input, and numeric values must come
//! back bit-identical (except NaN, which reads as zero).

use glam::{Mat4, Vec3};
use half::f16;
use netszr_wire::{LegacyBitArray, WireReader, from_bytes, to_bytes};
use proptest::prelude::*;

proptest! {
    /// Property: arbitrary bytes don't crash any decoder
    #[test]
    fn arbitrary_bytes_dont_crash_decoders(
        bytes in prop::collection::vec(any::<u8>(), 0..512),
    ) {
        let _ = from_bytes::<u64>(&bytes);
        let _ = from_bytes::<i32>(&bytes);
        let _ = from_bytes::<String>(&bytes);
        let _ = from_bytes::<Option<f64>>(&bytes);
        let _ = from_bytes::<Mat4>(&bytes);
        let _ = from_bytes::<LegacyBitArray>(&bytes);

        let mut r = WireReader::new(&bytes);
        while r.read_len_prefixed().is_ok() {}
    }

    /// Property: varints roundtrip for every u64
    #[test]
    fn varint_roundtrips(value in any::<u64>()) {
        prop_assert_eq!(from_bytes::<u64>(&to_bytes(&value)).unwrap(), value);
    }

    /// Property: zigzag roundtrips for every i64
    #[test]
    fn zigzag_roundtrips(value in any::<i64>()) {
        prop_assert_eq!(from_bytes::<i64>(&to_bytes(&value)).unwrap(), value);
    }

    /// Property: f32 keeps its bits unless it is NaN
    #[test]
    fn f32_is_bit_exact_or_zero(bits in any::<u32>()) {
        let value = f32::from_bits(bits);
        let decoded = from_bytes::<f32>(&to_bytes(&value)).unwrap();
        if value.is_nan() {
            prop_assert_eq!(decoded.to_bits(), 0);
        } else {
            prop_assert_eq!(decoded.to_bits(), bits);
        }
    }

    /// Property: f16 keeps its bits unless it is NaN
    #[test]
    fn f16_is_bit_exact_or_zero(bits in any::<u16>()) {
        let value = f16::from_bits(bits);
        let decoded = from_bytes::<f16>(&to_bytes(&value)).unwrap();
        if value.is_nan() {
            prop_assert_eq!(decoded.to_bits(), 0);
        } else {
            prop_assert_eq!(decoded.to_bits(), bits);
        }
    }

    /// Property: finite vectors roundtrip exactly
    #[test]
    fn vec3_roundtrips(x in -1.0e6f32..1.0e6, y in -1.0e6f32..1.0e6, z in -1.0e6f32..1.0e6) {
        let v = Vec3::new(x, y, z);
        prop_assert_eq!(from_bytes::<Vec3>(&to_bytes(&v)).unwrap(), v);
    }

    /// Property: bit arrays roundtrip with their version counter
    #[test]
    fn bit_array_roundtrips(
        bits in prop::collection::vec(any::<bool>(), 0..200),
        flips in prop::collection::vec(any::<usize>(), 0..8),
    ) {
        let mut array = LegacyBitArray::from_bools(&bits);
        for flip in flips {
            if !bits.is_empty() {
                let i = flip % bits.len();
                let current = array.get(i).unwrap_or(false);
                array.set(i, !current);
            }
        }
        let decoded = from_bytes::<LegacyBitArray>(&to_bytes(&array)).unwrap();
        prop_assert_eq!(decoded.version(), array.version());
        prop_assert_eq!(decoded, array);
    }
}
