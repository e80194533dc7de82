//! Bounds-checked cursor over borrowed wire bytes.

use crate::WireError;

/// Maximum encoded width of a `u64` varint.
const MAX_VARINT_BYTES: usize = 10;

/// Reads wire-encoded values from a borrowed slice.
///
/// Every read checks the remaining input first. Length prefixes are
/// validated against what is actually left before anything is sliced or
/// allocated, so a hostile length can never trigger a large allocation.
#[derive(Debug, Clone)]
pub struct WireReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> WireReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Offset of the cursor from the start of the input.
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn read_u8(&mut self) -> Result<u8, WireError> {
        let byte = *self.buf.get(self.pos).ok_or(WireError::UnexpectedEof {
            needed: 1,
            remaining: 0,
        })?;
        self.pos += 1;
        Ok(byte)
    }

    /// Reads exactly `n` raw bytes.
    pub fn read_raw(&mut self, n: usize) -> Result<&'a [u8], WireError> {
        let remaining = self.remaining();
        if n > remaining {
            return Err(WireError::UnexpectedEof {
                needed: n,
                remaining,
            });
        }
        let out = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], WireError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_raw(N)?);
        Ok(out)
    }

    /// Reads an unsigned LEB128 varint.
    pub fn read_varint(&mut self) -> Result<u64, WireError> {
        let mut value = 0u64;
        for i in 0..MAX_VARINT_BYTES {
            let byte = self.read_u8()?;
            let group = u64::from(byte & 0x7f);
            // The tenth byte may only carry the single top bit of a u64.
            if i == MAX_VARINT_BYTES - 1 && group > 1 {
                return Err(WireError::VarintOverflow("u64"));
            }
            value |= group << (7 * i);
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
        Err(WireError::VarintOverflow("u64"))
    }

    pub fn read_varint_u32(&mut self) -> Result<u32, WireError> {
        u32::try_from(self.read_varint()?).map_err(|_| WireError::VarintOverflow("u32"))
    }

    pub fn read_zigzag(&mut self) -> Result<i64, WireError> {
        let raw = self.read_varint()?;
        Ok(((raw >> 1) as i64) ^ -((raw & 1) as i64))
    }

    /// Reads a little-endian `f32`. NaN of any payload reads back as `0.0`.
    pub fn read_f32(&mut self) -> Result<f32, WireError> {
        let value = f32::from_le_bytes(self.read_array()?);
        Ok(if value.is_nan() { 0.0 } else { value })
    }

    /// Reads a little-endian `f64`. NaN of any payload reads back as `0.0`.
    pub fn read_f64(&mut self) -> Result<f64, WireError> {
        let value = f64::from_le_bytes(self.read_array()?);
        Ok(if value.is_nan() { 0.0 } else { value })
    }

    pub fn read_u16_le(&mut self) -> Result<u16, WireError> {
        Ok(u16::from_le_bytes(self.read_array()?))
    }

    /// Reads a varint length and checks it against the remaining input.
    ///
    /// Use this before allocating a container of `len` elements: each element
    /// occupies at least one byte, so a length larger than the remaining input
    /// is always malformed.
    pub fn read_len(&mut self) -> Result<usize, WireError> {
        self.read_len_bounded(u64::MAX)
    }

    /// Like [`read_len`](Self::read_len) with an additional caller limit.
    pub fn read_len_bounded(&mut self, limit: u64) -> Result<usize, WireError> {
        let len = self.read_varint()?;
        let remaining = self.remaining() as u64;
        if len > limit {
            return Err(WireError::LengthTooLarge { len, limit });
        }
        if len > remaining {
            return Err(WireError::LengthTooLarge {
                len,
                limit: remaining,
            });
        }
        Ok(len as usize)
    }

    /// Reads a varint length followed by that many raw bytes.
    pub fn read_len_prefixed(&mut self) -> Result<&'a [u8], WireError> {
        let len = self.read_len()?;
        self.read_raw(len)
    }

    /// Reads a length-prefixed UTF-8 string slice.
    pub fn read_str(&mut self) -> Result<&'a str, WireError> {
        std::str::from_utf8(self.read_len_prefixed()?).map_err(|_| WireError::InvalidUtf8)
    }

    /// Fails if any input is left unconsumed.
    pub fn finish(&self) -> Result<(), WireError> {
        match self.remaining() {
            0 => Ok(()),
            n => Err(WireError::TrailingBytes(n)),
        }
    }
}
