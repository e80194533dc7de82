//! The frozen string table, its package format and the mapped string codec.

use std::collections::HashMap;
use std::fmt;
use std::io::Read;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use netszr_wire::{WireReader, WireWriter};

use crate::{PackageLimits, StringsError};

/// Marker for a `None` string.
const MARKER_NULL: u64 = 0;
/// Marker for a string sent inline.
const MARKER_UNMAPPED: u64 = 1;
/// Mapped index `i` is sent as `i + FIRST_MAPPED`.
const FIRST_MAPPED: u64 = 2;

/// Length in bytes of a [`PackageHash`].
pub const HASH_LEN: usize = 32;

// ---------------------------------------------------------------------------
// PackageHash
// ---------------------------------------------------------------------------

/// blake3 digest of a string table's uncompressed content.
///
/// Displays as unpadded URL-safe base64, which is also the cache file suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PackageHash([u8; HASH_LEN]);

impl PackageHash {
    pub fn new(bytes: [u8; HASH_LEN]) -> Self {
        Self(bytes)
    }

    /// Returns `None` unless `bytes` is exactly [`HASH_LEN`] long.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        <[u8; HASH_LEN]>::try_from(bytes).ok().map(Self)
    }

    pub fn as_bytes(&self) -> &[u8; HASH_LEN] {
        &self.0
    }
}

impl fmt::Display for PackageHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&URL_SAFE_NO_PAD.encode(self.0))
    }
}

// ---------------------------------------------------------------------------
// MappedStrings
// ---------------------------------------------------------------------------

/// An immutable, sorted string table shared by both peers.
///
/// Built once by [`MappedStringDict::finalize`](crate::MappedStringDict::finalize)
/// on the server or loaded from a package on the client. Index `i` is the
/// `i`-th string in byte-ordinal order, so two peers holding the same
/// strings agree on every index.
#[derive(Debug)]
pub struct MappedStrings {
    strings: Vec<String>,
    index: HashMap<String, u32>,
    hash: PackageHash,
    package: Vec<u8>,
}

impl MappedStrings {
    /// Builds a table from strings already sorted and deduplicated.
    pub(crate) fn from_sorted(
        strings: Vec<String>,
        limits: &PackageLimits,
    ) -> Result<Self, StringsError> {
        let content = encode_content(&strings);
        let hash = PackageHash(*blake3::hash(&content).as_bytes());
        let mut package = zstd::bulk::compress(&content, limits.compression_level)?;
        package.extend_from_slice(hash.as_bytes());
        Ok(Self::assemble(strings, hash, package))
    }

    fn assemble(strings: Vec<String>, hash: PackageHash, package: Vec<u8>) -> Self {
        let index = strings
            .iter()
            .enumerate()
            .map(|(i, s)| (s.clone(), i as u32))
            .collect();
        Self {
            strings,
            index,
            hash,
            package,
        }
    }

    /// Loads a table from package bytes.
    ///
    /// Decompression stops at `limits.max_decompressed_bytes`. The trailing
    /// hash must match the recomputed content hash, the strings must be in
    /// strictly ascending order, and no bytes may follow the last string.
    pub fn from_package(bytes: &[u8], limits: &PackageLimits) -> Result<Self, StringsError> {
        let Some(split) = bytes.len().checked_sub(HASH_LEN) else {
            return Err(StringsError::CorruptPackage(format!(
                "{} bytes is shorter than the hash trailer",
                bytes.len()
            )));
        };
        let (body, trailer) = bytes.split_at(split);

        let content = decompress_bounded(body, limits.max_decompressed_bytes)?;
        let hash = PackageHash(*blake3::hash(&content).as_bytes());
        if hash.as_bytes()[..] != *trailer {
            return Err(StringsError::CorruptPackage(
                "content hash does not match trailer".into(),
            ));
        }

        let mut r = WireReader::new(&content);
        let count = r.read_len()?;
        let mut strings: Vec<String> = Vec::with_capacity(count);
        for _ in 0..count {
            let s = r.read_str()?;
            if let Some(prev) = strings.last() {
                if prev.as_str() >= s {
                    return Err(StringsError::CorruptPackage(format!(
                        "strings out of order at {s:?}"
                    )));
                }
            }
            strings.push(s.to_owned());
        }
        r.finish()?;

        Ok(Self::assemble(strings, hash, bytes.to_vec()))
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    pub fn strings(&self) -> &[String] {
        &self.strings
    }

    pub fn get(&self, index: u32) -> Option<&str> {
        self.strings.get(index as usize).map(String::as_str)
    }

    pub fn index_of(&self, s: &str) -> Option<u32> {
        self.index.get(s).copied()
    }

    pub fn hash(&self) -> &PackageHash {
        &self.hash
    }

    /// The package bytes: `zstd(content) ++ hash`.
    pub fn package(&self) -> &[u8] {
        &self.package
    }

    /// Writes a string as a mapped index, an inline string, or null.
    ///
    /// Only direct callers write null. The serde layer encodes
    /// `Option<String>` with its own tag and never passes `None` here.
    pub fn write_mapped_string(&self, w: &mut WireWriter, value: Option<&str>) {
        match value {
            None => w.write_varint(MARKER_NULL),
            Some(s) => match self.index.get(s) {
                Some(&i) => w.write_varint(u64::from(i) + FIRST_MAPPED),
                None => {
                    w.write_varint(MARKER_UNMAPPED);
                    w.write_len_prefixed(s.as_bytes());
                }
            },
        }
    }

    /// Reads a string written by [`write_mapped_string`](Self::write_mapped_string).
    pub fn read_mapped_string(&self, r: &mut WireReader<'_>) -> Result<Option<String>, StringsError> {
        match r.read_varint()? {
            MARKER_NULL => Ok(None),
            MARKER_UNMAPPED => Ok(Some(r.read_str()?.to_owned())),
            marker => {
                let index = marker - FIRST_MAPPED;
                self.strings
                    .get(usize::try_from(index).unwrap_or(usize::MAX))
                    .cloned()
                    .map(Some)
                    .ok_or(StringsError::UnknownIndex {
                        index,
                        len: self.strings.len(),
                    })
            }
        }
    }
}

/// `varint count, { varint len, utf8 }*`
fn encode_content(strings: &[String]) -> Vec<u8> {
    let mut w = WireWriter::with_capacity(strings.iter().map(|s| s.len() + 2).sum());
    w.write_varint(strings.len() as u64);
    for s in strings {
        w.write_len_prefixed(s.as_bytes());
    }
    w.into_bytes()
}

fn decompress_bounded(body: &[u8], limit: usize) -> Result<Vec<u8>, StringsError> {
    let decoder = zstd::stream::read::Decoder::new(body)
        .map_err(|e| StringsError::CorruptPackage(format!("zstd: {e}")))?;
    let mut out = Vec::new();
    decoder
        .take(limit as u64 + 1)
        .read_to_end(&mut out)
        .map_err(|e| StringsError::CorruptPackage(format!("zstd: {e}")))?;
    if out.len() > limit {
        return Err(StringsError::PackageTooLarge { limit });
    }
    Ok(out)
}
