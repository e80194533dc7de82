//! The [`Codec`] trait: encode and decode values whose type both sides
//! already agree on.
//!
//! Higher layers hold a `Codec` rather than a concrete serializer, so a
//! test can swap in something simpler without touching the callers.

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::{BinarySerializer, SerializerError};

/// Converts values to bytes and back.
///
/// `Send + Sync + 'static` because a codec is usually shared by every
/// task that handles a connection.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>, SerializerError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Malformed input, input for another type, or trailing bytes.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, SerializerError>;
}

/// Direct form: no type header.
impl Codec for BinarySerializer {
    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>, SerializerError> {
        self.serialize_direct(value)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, SerializerError> {
        self.deserialize_direct(data)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use netszr_strings::MappedStringDict;
    use serde::Deserialize;

    use super::*;
    use crate::TypeTableBuilder;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Inventory {
        owner: String,
        slots: BTreeMap<String, u16>,
    }

    fn roundtrip<C: Codec>(codec: &C, value: &Inventory) -> Inventory {
        let bytes = codec.encode(value).unwrap();
        codec.decode(&bytes).unwrap()
    }

    #[test]
    fn test_codec_binary_serializer_roundtrip() {
        let dict = MappedStringDict::default();
        dict.add_strings(["crowbar", "Engineer"], "test").unwrap();
        dict.finalize().unwrap();
        let serializer = BinarySerializer::new(
            Arc::new(TypeTableBuilder::new().build().unwrap()),
            Arc::new(dict),
        );

        let inventory = Inventory {
            owner: "Engineer".into(),
            slots: BTreeMap::from([("crowbar".into(), 1), ("unmapped thing".into(), 2)]),
        };
        assert_eq!(roundtrip(&serializer, &inventory), inventory);
    }
}
