//! Frame encoding for [`HandshakeMessage`].
//!
//! A frame is one tag byte followed by the message's single field:
//!
//! | tag | message           | field                                   |
//! |-----|-------------------|-----------------------------------------|
//! | 1   | `ServerHandshake` | varint len (≤ 64) + hash bytes          |
//! | 2   | `ClientHandshake` | one byte, 0 or 1                        |
//! | 3   | `StringsPackage`  | varint len (≤ `max_package_bytes`) + bytes |
//! | 4   | `Disconnect`      | varint len (≤ 1024) + UTF-8             |
//!
//! Nothing may follow the field.

use netszr_wire::{WireDecode, WireReader, WireWriter};

use crate::message::tag;
use crate::{HandshakeMessage, ProtocolError};

/// Longest hash a `ServerHandshake` may carry.
pub const MAX_HASH_LEN: u64 = 64;

/// Longest disconnect reason, in bytes.
pub const MAX_REASON_LEN: u64 = 1024;

/// Default bound on a `StringsPackage` payload.
pub const DEFAULT_MAX_PACKAGE_BYTES: usize = 16 * 1024 * 1024;

/// Encodes and decodes handshake frames.
///
/// The codec is cheap to copy; it only carries the package size limit.
#[derive(Debug, Clone, Copy)]
pub struct FrameCodec {
    max_package_bytes: usize,
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PACKAGE_BYTES)
    }
}

impl FrameCodec {
    pub fn new(max_package_bytes: usize) -> Self {
        Self { max_package_bytes }
    }

    pub fn max_package_bytes(&self) -> usize {
        self.max_package_bytes
    }

    pub fn encode(&self, message: &HandshakeMessage) -> Vec<u8> {
        let mut w = WireWriter::new();
        w.write_u8(message.tag());
        match message {
            HandshakeMessage::ServerHandshake { hash } => w.write_len_prefixed(hash),
            HandshakeMessage::ClientHandshake { needs_strings } => {
                w.write_u8(u8::from(*needs_strings));
            }
            HandshakeMessage::StringsPackage { package } => w.write_len_prefixed(package),
            HandshakeMessage::Disconnect { reason } => w.write_len_prefixed(reason.as_bytes()),
        }
        w.into_bytes()
    }

    pub fn decode(&self, frame: &[u8]) -> Result<HandshakeMessage, ProtocolError> {
        let mut r = WireReader::new(frame);
        let tag = r.read_u8().map_err(|_| ProtocolError::EmptyFrame)?;
        let message = match tag {
            tag::SERVER_HANDSHAKE => HandshakeMessage::ServerHandshake {
                hash: read_field(&mut r, "hash", MAX_HASH_LEN)?.to_vec(),
            },
            tag::CLIENT_HANDSHAKE => HandshakeMessage::ClientHandshake {
                needs_strings: bool::decode(&mut r)?,
            },
            tag::STRINGS_PACKAGE => HandshakeMessage::StringsPackage {
                package: read_field(&mut r, "package", self.max_package_bytes as u64)?.to_vec(),
            },
            tag::DISCONNECT => {
                let bytes = read_field(&mut r, "reason", MAX_REASON_LEN)?;
                let reason = std::str::from_utf8(bytes)
                    .map_err(|_| netszr_wire::WireError::InvalidUtf8)?;
                HandshakeMessage::Disconnect {
                    reason: reason.to_owned(),
                }
            }
            other => return Err(ProtocolError::UnknownTag(other)),
        };
        r.finish()?;
        Ok(message)
    }
}

/// Reads a varint length, checks it against `limit`, then reads the bytes.
fn read_field<'a>(
    r: &mut WireReader<'a>,
    field: &'static str,
    limit: u64,
) -> Result<&'a [u8], ProtocolError> {
    let len = r.read_varint()?;
    if len > limit {
        return Err(ProtocolError::FieldTooLarge { field, len, limit });
    }
    Ok(r.read_raw(len as usize)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use netszr_wire::WireError;

    #[test]
    fn test_encode_client_handshake_is_two_bytes() {
        let codec = FrameCodec::default();
        let frame = codec.encode(&HandshakeMessage::ClientHandshake {
            needs_strings: true,
        });
        assert_eq!(frame, vec![tag::CLIENT_HANDSHAKE, 1]);
    }

    #[test]
    fn test_decode_roundtrips_each_message() {
        let codec = FrameCodec::default();
        let messages = [
            HandshakeMessage::ServerHandshake {
                hash: vec![0xab; 32],
            },
            HandshakeMessage::ClientHandshake {
                needs_strings: false,
            },
            HandshakeMessage::StringsPackage {
                package: vec![1, 2, 3, 4],
            },
            HandshakeMessage::Disconnect {
                reason: "duplicate strings request".into(),
            },
        ];
        for message in messages {
            assert_eq!(codec.decode(&codec.encode(&message)).unwrap(), message);
        }
    }

    #[test]
    fn test_decode_empty_frame() {
        assert!(matches!(
            FrameCodec::default().decode(&[]),
            Err(ProtocolError::EmptyFrame)
        ));
    }

    #[test]
    fn test_decode_unknown_tag() {
        assert!(matches!(
            FrameCodec::default().decode(&[9]),
            Err(ProtocolError::UnknownTag(9))
        ));
    }

    #[test]
    fn test_decode_rejects_non_boolean_flag() {
        assert!(matches!(
            FrameCodec::default().decode(&[tag::CLIENT_HANDSHAKE, 2]),
            Err(ProtocolError::Wire(WireError::InvalidBool(2)))
        ));
    }

    #[test]
    fn test_decode_rejects_oversized_hash() {
        let mut frame = vec![tag::SERVER_HANDSHAKE, 65];
        frame.extend_from_slice(&[0; 65]);
        assert!(matches!(
            FrameCodec::default().decode(&frame),
            Err(ProtocolError::FieldTooLarge { field: "hash", len: 65, .. })
        ));
    }

    #[test]
    fn test_decode_rejects_package_over_configured_limit() {
        let codec = FrameCodec::new(8);
        let frame = codec.encode(&HandshakeMessage::StringsPackage {
            package: vec![0; 9],
        });
        assert!(matches!(
            codec.decode(&frame),
            Err(ProtocolError::FieldTooLarge { field: "package", .. })
        ));
    }

    #[test]
    fn test_decode_huge_declared_length_does_not_allocate() {
        // Declares u64::MAX / 2 bytes of package with nothing behind it.
        let mut w = WireWriter::new();
        w.write_u8(tag::STRINGS_PACKAGE);
        w.write_varint(u64::MAX / 2);
        let codec = FrameCodec::new(usize::MAX);
        assert!(matches!(
            codec.decode(w.as_slice()),
            Err(ProtocolError::Wire(WireError::UnexpectedEof { .. }))
        ));
    }

    #[test]
    fn test_decode_rejects_trailing_bytes() {
        assert!(matches!(
            FrameCodec::default().decode(&[tag::CLIENT_HANDSHAKE, 0, 0]),
            Err(ProtocolError::Wire(WireError::TrailingBytes(1)))
        ));
    }

    #[test]
    fn test_decode_truncated_hash() {
        assert!(matches!(
            FrameCodec::default().decode(&[tag::SERVER_HANDSHAKE, 32, 1, 2]),
            Err(ProtocolError::Wire(WireError::UnexpectedEof { .. }))
        ));
    }
}
