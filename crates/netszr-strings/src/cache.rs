//! On-disk cache of string packages, keyed by hash.

use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::{MappedStrings, PackageHash, PackageLimits, StringsError};

/// A directory of `strings-<hash>` files, each holding one package.
///
/// Entries are written to a temporary file and renamed into place, so a
/// reader never sees a partial package.
#[derive(Debug, Clone)]
pub struct StringCache {
    dir: PathBuf,
}

impl StringCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, hash: &PackageHash) -> PathBuf {
        self.dir.join(format!("strings-{hash}"))
    }

    /// Loads the package cached for `hash`.
    ///
    /// Returns `Ok(None)` on a miss. A file that fails to parse, or whose
    /// content hashes to something other than `hash`, is deleted and also
    /// reported as a miss.
    pub fn load(
        &self,
        hash: &PackageHash,
        limits: &PackageLimits,
    ) -> Result<Option<MappedStrings>, StringsError> {
        let path = self.path_for(hash);
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let reason = match MappedStrings::from_package(&bytes, limits) {
            Ok(table) if table.hash() == hash => return Ok(Some(table)),
            Ok(table) => format!("content hash {} does not match name", table.hash()),
            Err(e) => e.to_string(),
        };

        tracing::warn!(path = %path.display(), %reason, "discarding bad cached string package");
        if let Err(e) = std::fs::remove_file(&path) {
            tracing::warn!(path = %path.display(), error = %e, "failed to delete cached string package");
        }
        Ok(None)
    }

    /// Writes `table`'s package under its hash. Returns the final path.
    pub fn store(&self, table: &MappedStrings) -> Result<PathBuf, StringsError> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.path_for(table.hash());

        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(table.package())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|e| e.error)?;

        tracing::debug!(path = %path.display(), bytes = table.package().len(), "cached string package");
        Ok(path)
    }
}
