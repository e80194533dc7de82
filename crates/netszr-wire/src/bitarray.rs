//! Bit array with the legacy versioned wire layout.
//!
//! Layout: zigzag `version`, varint word count, each word as a zigzag
//! `i32`, zigzag bit length. The version counter increments on every
//! mutation and travels with the data so both sides stay byte-identical.

use serde::{Deserialize, Serialize};

use crate::{WireDecode, WireEncode, WireError, WireReader, WireWriter};

const BITS_PER_WORD: usize = 32;

/// A fixed-length bit array carried in the legacy layout.
///
/// The serde representation has the same field order as the wire layout,
/// so the structural serializer and [`WireEncode`] produce the same bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "LegacyLayout", into = "LegacyLayout")]
pub struct LegacyBitArray {
    version: i32,
    words: Vec<i32>,
    len: usize,
}

#[derive(Serialize, Deserialize)]
struct LegacyLayout {
    version: i32,
    words: Vec<i32>,
    len: i32,
}

fn words_for(len: usize) -> usize {
    len.div_ceil(BITS_PER_WORD)
}

impl LegacyBitArray {
    /// Creates an array of `len` cleared bits.
    pub fn new(len: usize) -> Self {
        Self {
            version: 0,
            words: vec![0; words_for(len)],
            len,
        }
    }

    pub fn from_bools(bits: &[bool]) -> Self {
        let mut array = Self::new(bits.len());
        for (i, bit) in bits.iter().enumerate() {
            if *bit {
                array.words[i / BITS_PER_WORD] |= 1 << (i % BITS_PER_WORD);
            }
        }
        array
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Mutation counter carried on the wire.
    pub fn version(&self) -> i32 {
        self.version
    }

    /// Returns the bit at `index`, or `None` past the end.
    pub fn get(&self, index: usize) -> Option<bool> {
        if index >= self.len {
            return None;
        }
        let word = self.words[index / BITS_PER_WORD];
        Some(word & (1 << (index % BITS_PER_WORD)) != 0)
    }

    /// Sets the bit at `index`. Returns `false` if `index` is out of range.
    pub fn set(&mut self, index: usize, value: bool) -> bool {
        if index >= self.len {
            return false;
        }
        let mask = 1i32 << (index % BITS_PER_WORD);
        let word = &mut self.words[index / BITS_PER_WORD];
        if value {
            *word |= mask;
        } else {
            *word &= !mask;
        }
        self.version = self.version.wrapping_add(1);
        true
    }

    pub fn iter(&self) -> impl Iterator<Item = bool> + '_ {
        (0..self.len).map(|i| self.words[i / BITS_PER_WORD] & (1 << (i % BITS_PER_WORD)) != 0)
    }
}

impl TryFrom<LegacyLayout> for LegacyBitArray {
    type Error = WireError;

    fn try_from(layout: LegacyLayout) -> Result<Self, Self::Error> {
        let len = usize::try_from(layout.len)
            .map_err(|_| WireError::InvalidValue(format!("negative bit length {}", layout.len)))?;
        if len > layout.words.len() * BITS_PER_WORD {
            return Err(WireError::InvalidValue(format!(
                "bit length {len} exceeds {} words",
                layout.words.len()
            )));
        }
        if layout.words.len() != words_for(len) {
            return Err(WireError::InvalidValue(format!(
                "{} words for bit length {len}, expected {}",
                layout.words.len(),
                words_for(len)
            )));
        }
        Ok(Self {
            version: layout.version,
            words: layout.words,
            len,
        })
    }
}

impl From<LegacyBitArray> for LegacyLayout {
    fn from(array: LegacyBitArray) -> Self {
        Self {
            version: array.version,
            words: array.words,
            len: i32::try_from(array.len).unwrap_or(i32::MAX),
        }
    }
}

impl WireEncode for LegacyBitArray {
    fn encode(&self, w: &mut WireWriter) {
        w.write_zigzag(i64::from(self.version));
        w.write_varint(self.words.len() as u64);
        for word in &self.words {
            w.write_zigzag(i64::from(*word));
        }
        w.write_zigzag(self.len as i64);
    }
}

impl WireDecode for LegacyBitArray {
    fn decode(r: &mut WireReader<'_>) -> Result<Self, WireError> {
        let version = i32::decode(r)?;
        // Each word takes at least one byte.
        let count = r.read_len()?;
        let mut words = Vec::with_capacity(count);
        for _ in 0..count {
            words.push(i32::decode(r)?);
        }
        let len = i32::decode(r)?;
        LegacyLayout {
            version,
            words,
            len,
        }
        .try_into()
    }
}
