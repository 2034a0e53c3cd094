//! `localStorage` backed [`KeyValueStore`], with an in-memory fallback for
//! contexts where storage is blocked.
use dexcatch_game::{KeyValueStore, MemoryStore, StorageError};
use web_sys::Storage;

use crate::dom;

pub enum BrowserStore {
    Local(Storage),
    /// Used when `localStorage` is unavailable. Nothing survives a reload.
    Memory(MemoryStore),
}

impl BrowserStore {
    /// Open `localStorage`, falling back to memory when it is unavailable.
    #[must_use]
    pub fn open() -> Self {
        match dom::local_storage() {
            Ok(storage) => Self::Local(storage),
            Err(err) => {
                log::warn!(
                    "localStorage unavailable, progress will not persist: {}",
                    dom::js_error_message(&err)
                );
                Self::Memory(MemoryStore::new())
            }
        }
    }

    #[must_use]
    pub const fn is_persistent(&self) -> bool {
        matches!(self, Self::Local(_))
    }
}

fn unavailable(err: &wasm_bindgen::JsValue) -> StorageError {
    StorageError::Unavailable(dom::js_error_message(err))
}

impl KeyValueStore for BrowserStore {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        match self {
            Self::Local(storage) => storage.get_item(key).map_err(|err| unavailable(&err)),
            Self::Memory(memory) => memory.read(key),
        }
    }

    fn write(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        match self {
            Self::Local(storage) => storage.set_item(key, value).map_err(|err| {
                if dom::is_quota_error(&err) {
                    StorageError::QuotaExceeded
                } else {
                    unavailable(&err)
                }
            }),
            Self::Memory(memory) => memory.write(key, value),
        }
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        match self {
            Self::Local(storage) => storage.remove_item(key).map_err(|err| unavailable(&err)),
            Self::Memory(memory) => memory.remove(key),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_fallback_behaves_like_a_store() {
        let mut store = BrowserStore::Memory(MemoryStore::new());
        assert!(!store.is_persistent());
        store.write("dexcatch.inventory", "{}").unwrap();
        assert_eq!(store.read("dexcatch.inventory").unwrap().as_deref(), Some("{}"));
        store.remove("dexcatch.inventory").unwrap();
        assert_eq!(store.read("dexcatch.inventory").unwrap(), None);
    }
}
