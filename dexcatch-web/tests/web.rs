#![cfg(target_arch = "wasm32")]

use dexcatch_game::{CatchConfig, Collection, KeyValueStore, Persister};
use dexcatch_web::BrowserStore;
use dexcatch_web::bridge::DexSession;
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

#[wasm_bindgen_test]
fn local_storage_round_trips() {
    let mut store = BrowserStore::open();
    assert!(store.is_persistent());
    store.write("dexcatch.test", "{}").unwrap();
    assert_eq!(store.read("dexcatch.test").unwrap().as_deref(), Some("{}"));
    store.remove("dexcatch.test").unwrap();
    assert_eq!(store.read("dexcatch.test").unwrap(), None);
}

#[wasm_bindgen_test]
fn reset_writes_both_keys() {
    let session = DexSession::new(None, None).unwrap();
    session.reset_collection().unwrap();
    let config = CatchConfig::default_config();
    let persister = Persister::new(BrowserStore::open());
    let collection: Collection = persister.load(&config.collection_key());
    assert!(collection.is_empty());
    assert!(persister.store().read(&config.inventory_key()).unwrap().is_some());
}

#[wasm_bindgen_test]
fn rejects_invalid_config_override() {
    assert!(DexSession::new(Some(r#"{ "base_rate": 7 }"#.into()), None).is_err());
}
