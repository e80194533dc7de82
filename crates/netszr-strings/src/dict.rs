//! The mapped string dictionary: a building phase, then a frozen table.

use std::collections::BTreeSet;
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;

use crate::decompose::Expander;
use crate::{MappedStrings, PackageLimits, StringsConfig, StringsError};

/// Collects strings from any number of threads, then freezes them into a
/// shared [`MappedStrings`] table.
///
/// ```text
///   Building ──(finalize / adopt)──→ Frozen
/// ```
///
/// While building, every add expands its input outside the lock and then
/// commits the whole batch under one short critical section. Once frozen,
/// adds fail with [`StringsError::Locked`] and the table is read without
/// locking through [`frozen`](Self::frozen).
pub struct MappedStringDict {
    config: StringsConfig,
    limits: PackageLimits,
    building: Mutex<BTreeSet<String>>,
    table: OnceLock<Arc<MappedStrings>>,
}

impl MappedStringDict {
    pub fn new(config: StringsConfig, limits: PackageLimits) -> Self {
        Self {
            config,
            limits,
            building: Mutex::new(BTreeSet::new()),
            table: OnceLock::new(),
        }
    }

    pub fn config(&self) -> &StringsConfig {
        &self.config
    }

    pub fn limits(&self) -> &PackageLimits {
        &self.limits
    }

    pub fn is_locked(&self) -> bool {
        self.table.get().is_some()
    }

    /// Strings collected so far (before freezing) or the table size (after).
    pub fn len(&self) -> usize {
        match self.table.get() {
            Some(table) => table.len(),
            None => self.building.lock().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Adds a string and its decomposition.
    ///
    /// Returns `Ok(true)` if the canonical form of `s` was not present
    /// before, `Ok(false)` if it was already present or `s` falls outside
    /// the length window.
    pub fn add_string(&self, s: &str) -> Result<bool, StringsError> {
        self.ensure_building()?;
        let mut expander = Expander::new(&self.config);
        let Some(canonical) = expander.add(s) else {
            return Ok(false);
        };

        let mut set = self.building.lock();
        self.ensure_building()?;
        let fresh = !set.contains(&canonical);
        set.extend(expander.into_batch());
        Ok(fresh)
    }

    /// Adds every string from `strings`. Returns how many entries the
    /// dictionary gained, decomposition included.
    pub fn add_strings<I, S>(&self, strings: I, provider: &str) -> Result<usize, StringsError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.ensure_building()?;
        let mut expander = Expander::new(&self.config);
        for s in strings {
            expander.add(s.as_ref());
        }
        let added = self.commit(expander)?;
        tracing::debug!(provider, added, "mapped strings from provider");
        Ok(added)
    }

    /// Adds object keys and string leaves of a JSON document.
    pub fn add_json_strings(
        &self,
        value: &serde_json::Value,
        name: &str,
    ) -> Result<usize, StringsError> {
        self.ensure_building()?;
        let mut expander = Expander::new(&self.config);
        collect_json(value, &mut expander);
        let added = self.commit(expander)?;
        tracing::debug!(source = name, added, "mapped strings from json");
        Ok(added)
    }

    /// Discards everything collected so far.
    pub fn clear(&self) -> Result<(), StringsError> {
        let mut set = self.building.lock();
        self.ensure_building()?;
        set.clear();
        Ok(())
    }

    /// Freezes the dictionary: sorts, indexes, hashes and packages the
    /// collected strings.
    ///
    /// Idempotent; later calls return the same table.
    pub fn finalize(&self) -> Result<Arc<MappedStrings>, StringsError> {
        if let Some(table) = self.table.get() {
            return Ok(Arc::clone(table));
        }

        let mut set = self.building.lock();
        if let Some(table) = self.table.get() {
            return Ok(Arc::clone(table));
        }

        let strings: Vec<String> = set.iter().cloned().collect();
        let table = Arc::new(MappedStrings::from_sorted(strings, &self.limits)?);
        set.clear();
        tracing::info!(
            count = table.len(),
            hash = %table.hash(),
            bytes = table.package().len(),
            "mapped strings locked in"
        );
        self.publish(Arc::clone(&table))?;
        Ok(table)
    }

    /// Freezes the dictionary with a table obtained elsewhere, typically a
    /// package received from the server or loaded from the cache.
    pub fn adopt(&self, table: Arc<MappedStrings>) -> Result<(), StringsError> {
        let mut set = self.building.lock();
        self.ensure_building()?;
        set.clear();
        tracing::debug!(count = table.len(), hash = %table.hash(), "adopted mapped strings");
        self.publish(table)
    }

    /// The frozen table.
    pub fn frozen(&self) -> Result<&Arc<MappedStrings>, StringsError> {
        self.table.get().ok_or(StringsError::NotLocked)
    }

    fn ensure_building(&self) -> Result<(), StringsError> {
        if self.is_locked() {
            Err(StringsError::Locked)
        } else {
            Ok(())
        }
    }

    fn commit(&self, expander: Expander<'_>) -> Result<usize, StringsError> {
        let batch = expander.into_batch();
        let mut set = self.building.lock();
        self.ensure_building()?;
        let before = set.len();
        set.extend(batch);
        Ok(set.len() - before)
    }

    /// Must be called with the building lock held.
    fn publish(&self, table: Arc<MappedStrings>) -> Result<(), StringsError> {
        self.table.set(table).map_err(|_| StringsError::Locked)
    }
}

impl Default for MappedStringDict {
    fn default() -> Self {
        Self::new(StringsConfig::default(), PackageLimits::default())
    }
}

fn collect_json(value: &serde_json::Value, expander: &mut Expander<'_>) {
    match value {
        serde_json::Value::String(s) => {
            expander.add(s);
        }
        serde_json::Value::Array(items) => {
            for item in items {
                collect_json(item, expander);
            }
        }
        serde_json::Value::Object(map) => {
            for (key, item) in map {
                expander.add(key);
                collect_json(item, expander);
            }
        }
        _ => {}
    }
}
