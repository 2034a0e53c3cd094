//! Key-value persistence with fallback-to-default loads and degrading saves.
//!
//! Saves walk an ordered list of [`SaveStrategy`] values. A strategy is skipped
//! when the store's capacity probe says the payload cannot fit, or when the
//! write itself fails; the first strategy that lands determines the
//! [`SaveOutcome`].
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::borrow::Cow;
use std::collections::HashMap;

use crate::collection::Collection;
use crate::inventory::Inventory;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    #[error("storage quota exceeded")]
    QuotaExceeded,
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Backing key-value store, e.g. browser `localStorage`.
pub trait KeyValueStore {
    /// Read a value.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be accessed.
    fn read(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write a value, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns an error if the store rejects the write (quota or access).
    fn write(&mut self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove a value.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be accessed.
    fn remove(&mut self, key: &str) -> Result<(), StorageError>;

    /// Bytes still writable for `key`, if the store can tell.
    fn capacity_hint(&self, _key: &str) -> Option<usize> {
        None
    }
}

/// Degradation level of a persisted payload, most complete first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveStrategy {
    Full,
    Compact,
    MetadataOnly,
}

impl SaveStrategy {
    pub const ORDER: [Self; 3] = [Self::Full, Self::Compact, Self::MetadataOnly];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveOutcome {
    Full,
    Partial,
    MetadataOnly,
    Failed,
}

impl SaveOutcome {
    #[must_use]
    pub const fn is_degraded(self) -> bool {
        !matches!(self, Self::Full)
    }

    const fn from_strategy(strategy: SaveStrategy) -> Self {
        match strategy {
            SaveStrategy::Full => Self::Full,
            SaveStrategy::Compact => Self::Partial,
            SaveStrategy::MetadataOnly => Self::MetadataOnly,
        }
    }
}

/// A value that can be written at one or more degradation levels.
pub trait Persist: Serialize + DeserializeOwned + Clone + Default {
    /// The value reduced for `strategy`, or `None` if the strategy does not apply.
    fn degrade(&self, strategy: SaveStrategy) -> Option<Cow<'_, Self>>;
}

impl Persist for Collection {
    fn degrade(&self, strategy: SaveStrategy) -> Option<Cow<'_, Self>> {
        Some(match strategy {
            SaveStrategy::Full => Cow::Borrowed(self),
            SaveStrategy::Compact => Cow::Owned(self.without_sprites()),
            SaveStrategy::MetadataOnly => Cow::Owned(self.caught_metadata()),
        })
    }
}

impl Persist for Inventory {
    fn degrade(&self, strategy: SaveStrategy) -> Option<Cow<'_, Self>> {
        matches!(strategy, SaveStrategy::Full).then_some(Cow::Borrowed(self))
    }
}

/// What happened during a save.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SaveReport {
    pub key: String,
    pub outcome: SaveOutcome,
    pub bytes_written: usize,
    /// Strategies that were tried and skipped, with the reason.
    pub skipped: Vec<(SaveStrategy, String)>,
}

/// Reads and writes [`Persist`] values against a [`KeyValueStore`].
#[derive(Debug, Clone, Default)]
pub struct Persister<S> {
    store: S,
}

impl<S: KeyValueStore> Persister<S> {
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    pub const fn store(&self) -> &S {
        &self.store
    }

    pub const fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Load `key`, falling back to the default value on absence, access
    /// failure, or malformed data.
    pub fn load<T: Persist>(&self, key: &str) -> T {
        self.load_or_else(key, T::default)
    }

    /// Like [`Persister::load`] with a caller-supplied fallback.
    pub fn load_or_else<T: Persist>(&self, key: &str, fallback: impl FnOnce() -> T) -> T {
        match self.store.read(key) {
            Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|err| {
                log::warn!("discarding malformed data under {key}: {err}");
                fallback()
            }),
            Ok(None) => fallback(),
            Err(err) => {
                log::warn!("could not read {key}, using defaults: {err}");
                fallback()
            }
        }
    }

    /// Save `value` under `key`, degrading as needed. Never returns an error.
    pub fn save<T: Persist>(&mut self, key: &str, value: &T) -> SaveReport {
        let mut skipped = Vec::new();
        for strategy in SaveStrategy::ORDER {
            let Some(view) = value.degrade(strategy) else {
                continue;
            };
            let payload = match serde_json::to_string(view.as_ref()) {
                Ok(payload) => payload,
                Err(err) => {
                    skipped.push((strategy, StorageError::Serialization(err.to_string()).to_string()));
                    continue;
                }
            };
            if let Some(capacity) = self.store.capacity_hint(key)
                && payload.len() > capacity
            {
                skipped.push((
                    strategy,
                    format!("payload {} bytes exceeds capacity {capacity}", payload.len()),
                ));
                continue;
            }
            match self.store.write(key, &payload) {
                Ok(()) => {
                    let outcome = SaveOutcome::from_strategy(strategy);
                    if outcome.is_degraded() {
                        log::warn!("saved {key} with {strategy:?} strategy");
                    }
                    return SaveReport {
                        key: key.to_string(),
                        outcome,
                        bytes_written: payload.len(),
                        skipped,
                    };
                }
                Err(err) => skipped.push((strategy, err.to_string())),
            }
        }
        log::warn!("failed to save {key}: every strategy was rejected");
        SaveReport {
            key: key.to_string(),
            outcome: SaveOutcome::Failed,
            bytes_written: 0,
            skipped,
        }
    }

    /// Remove `key`.
    ///
    /// # Errors
    ///
    /// Propagates the store's error.
    pub fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        self.store.remove(key)
    }
}

/// In-memory store with an optional per-value byte limit and failure switch.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: HashMap<String, String>,
    max_value_bytes: Option<usize>,
    fail_writes: bool,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject writes larger than `bytes` with [`StorageError::QuotaExceeded`].
    #[must_use]
    pub const fn with_value_limit(mut self, bytes: usize) -> Self {
        self.max_value_bytes = Some(bytes);
        self
    }

    pub fn set_fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }

    #[must_use]
    pub fn raw(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn put_raw(&mut self, key: &str, value: &str) {
        self.values.insert(key.to_string(), value.to_string());
    }
}

impl KeyValueStore for MemoryStore {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.values.get(key).cloned())
    }

    fn write(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        if self.fail_writes {
            return Err(StorageError::Unavailable("writes disabled".into()));
        }
        if self.max_value_bytes.is_some_and(|limit| value.len() > limit) {
            return Err(StorageError::QuotaExceeded);
        }
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        self.values.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encounter::Encounter;

    fn sample_collection() -> Collection {
        let mut collection = Collection::new();
        for id in 1..=20 {
            let encounter = Encounter {
                id,
                name: format!("creature-{id}"),
                sprite: Some(format!("https://img.example/sprites/pokemon/{id}.png")),
                types: vec!["normal".into(), "flying".into()],
                shiny: false,
                is_legendary: false,
            };
            if id % 2 == 0 {
                collection.mark_caught(&encounter, u64::from(id));
            } else {
                collection.observe(&encounter);
            }
        }
        collection
    }

    fn payload_len(collection: &Collection) -> usize {
        serde_json::to_string(collection).unwrap().len()
    }

    #[test]
    fn full_save_round_trips() {
        let mut persister = Persister::new(MemoryStore::new());
        let collection = sample_collection();
        let report = persister.save("k", &collection);
        assert_eq!(report.outcome, SaveOutcome::Full);
        assert!(report.skipped.is_empty());
        assert_eq!(persister.load::<Collection>("k"), collection);
    }

    #[test]
    fn quota_errors_walk_down_the_strategies() {
        let collection = sample_collection();
        let compact_len = payload_len(&collection.without_sprites());
        let mut persister = Persister::new(MemoryStore::new().with_value_limit(compact_len));
        let report = persister.save("k", &collection);
        assert_eq!(report.outcome, SaveOutcome::Partial);
        assert_eq!(report.skipped.len(), 1);
        let loaded: Collection = persister.load("k");
        assert_eq!(loaded.len(), 20);
        assert!(loaded.records().all(|r| r.sprite.is_none()));

        let meta_len = payload_len(&collection.caught_metadata());
        let mut persister = Persister::new(MemoryStore::new().with_value_limit(meta_len));
        let report = persister.save("k", &collection);
        assert_eq!(report.outcome, SaveOutcome::MetadataOnly);
        let loaded: Collection = persister.load("k");
        assert_eq!(loaded.len(), 10);
        assert!(loaded.records().all(|r| r.caught && r.captured_at.is_some()));
    }

    struct ProbedStore {
        inner: MemoryStore,
        capacity: usize,
        writes: usize,
    }

    impl KeyValueStore for ProbedStore {
        fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
            self.inner.read(key)
        }

        fn write(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
            self.writes += 1;
            self.inner.write(key, value)
        }

        fn remove(&mut self, key: &str) -> Result<(), StorageError> {
            self.inner.remove(key)
        }

        fn capacity_hint(&self, _key: &str) -> Option<usize> {
            Some(self.capacity)
        }
    }

    #[test]
    fn capacity_probe_skips_without_writing() {
        let collection = sample_collection();
        let capacity = payload_len(&collection.without_sprites());
        let mut persister = Persister::new(ProbedStore {
            inner: MemoryStore::new(),
            capacity,
            writes: 0,
        });
        let report = persister.save("k", &collection);
        assert_eq!(report.outcome, SaveOutcome::Partial);
        assert_eq!(persister.store().writes, 1);
    }

    #[test]
    fn total_failure_is_reported_not_raised() {
        let mut store = MemoryStore::new();
        store.set_fail_writes(true);
        let mut persister = Persister::new(store);
        let report = persister.save("inv", &Inventory::default());
        assert_eq!(report.outcome, SaveOutcome::Failed);
        assert_eq!(report.skipped.len(), 1, "inventory only has a full form");
    }

    #[test]
    fn malformed_data_loads_as_default() {
        let mut store = MemoryStore::new();
        store.put_raw("c", "{ definitely not json");
        store.put_raw("i", r#"{ "counts": { "great": "lots" } }"#);
        let persister = Persister::new(store);
        assert!(persister.load::<Collection>("c").is_empty());
        assert_eq!(persister.load::<Inventory>("i"), Inventory::default());
        assert!(persister.load::<Collection>("missing").is_empty());
    }
}
