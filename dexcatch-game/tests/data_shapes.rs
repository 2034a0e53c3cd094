use std::hash::Hasher;

use dexcatch_game::{
    BallKind, CatchConfig, Collection, Encounter, ExportEnvelope, ExportFormat, Inventory,
    MemoryStore, Persister, SaveOutcome, StartingStock, Stock, export_collection, parse_import,
};
use serde_json::{Value, json};
use twox_hash::XxHash64;

fn snapshot_hash(bytes: &[u8]) -> u64 {
    let mut hasher = XxHash64::with_seed(0);
    hasher.write(bytes);
    hasher.finish()
}

fn sample_collection() -> Collection {
    let mut collection = Collection::new();
    for id in [1_u32, 4, 7, 25, 150] {
        let encounter = Encounter {
            id,
            name: format!("creature-{id}"),
            sprite: Some(format!("https://sprites.example/{id}.png")),
            types: vec!["normal".into()],
            shiny: id == 25,
            is_legendary: id == 150,
        };
        if id % 2 == 1 {
            collection.mark_caught(&encounter, 1_000 + u64::from(id));
        } else {
            collection.observe(&encounter);
        }
    }
    collection
}

#[test]
fn inventory_persists_with_unlimited_sentinel() {
    let inventory = Inventory::starting(&StartingStock::default());
    let value = serde_json::to_value(&inventory).unwrap();
    assert_eq!(
        value,
        json!({ "counts": { "poke": -1, "great": 2, "ultra": 1 }, "total_captures": 0 })
    );
    let restored: Inventory = serde_json::from_value(value).unwrap();
    assert_eq!(restored, inventory);
}

#[test]
fn legacy_inventory_fields_fall_back() {
    let restored: Inventory =
        serde_json::from_str(r#"{ "counts": { "great": -7 }, "total_captures": 12 }"#).unwrap();
    assert_eq!(restored.stock(BallKind::Poke), Stock::Unlimited);
    assert_eq!(restored.stock(BallKind::Great), Stock::Count(0));
    assert_eq!(restored.stock(BallKind::Ultra), Stock::Count(0));
    assert_eq!(restored.total_captures(), 12);
}

#[test]
fn collection_persists_as_id_keyed_records() {
    let value = serde_json::to_value(sample_collection()).unwrap();
    let Value::Object(map) = &value else {
        panic!("collection should persist as an object");
    };
    let mut ids: Vec<u32> = map.keys().map(|k| k.parse().unwrap()).collect();
    ids.sort_unstable();
    assert_eq!(ids, [1, 4, 7, 25, 150]);
    assert_eq!(value["4"]["caught"], json!(false));
    assert!(value["4"].get("captured_at").is_none());
    assert_eq!(value["7"]["captured_at"], json!(1_007));
}

#[test]
fn metadata_only_payload_reloads() {
    let collection = sample_collection();
    let key = CatchConfig::default_config().collection_key();
    let full_len = serde_json::to_string(&collection).unwrap().len();
    let compact_len = serde_json::to_string(&collection.without_sprites())
        .unwrap()
        .len();
    let meta_len = serde_json::to_string(&collection.caught_metadata())
        .unwrap()
        .len();
    assert!(meta_len < compact_len && compact_len < full_len);

    let mut persister = Persister::new(MemoryStore::new().with_value_limit(meta_len));
    let report = persister.save(&key, &collection);
    assert_eq!(report.outcome, SaveOutcome::MetadataOnly);
    assert_eq!(report.skipped.len(), 2);
    let reloaded: Collection = persister.load(&key);
    assert_eq!(reloaded.len(), 3);
    assert!(reloaded.records().all(|r| r.caught && r.captured_at.is_some()));
    assert!(reloaded.get(25).is_some_and(|r| r.shiny));
}

#[test]
fn export_checksum_matches_records_payload() {
    let collection = sample_collection();
    let text = export_collection(&collection, ExportFormat::Json, 42).unwrap();
    let envelope: ExportEnvelope = serde_json::from_str(&text).unwrap();
    assert_eq!(envelope.format, "dexcatch.collection");
    assert_eq!(envelope.version, 1);
    assert_eq!(envelope.exported_at, 42);

    let records = serde_json::to_vec(&envelope.records).unwrap();
    let expected = format!("{:016x}", snapshot_hash(&records));
    assert_eq!(envelope.checksum.as_deref(), Some(expected.as_str()));

    let digest_a = snapshot_hash(text.as_bytes());
    let again = export_collection(&parse_import(&text, 1025).unwrap(), ExportFormat::Json, 42)
        .unwrap();
    assert_eq!(digest_a, snapshot_hash(again.as_bytes()), "export is stable");
}

#[test]
fn csv_export_has_header_and_row_per_record() {
    let csv = export_collection(&sample_collection(), ExportFormat::Csv, 0).unwrap();
    let mut lines = csv.lines();
    assert_eq!(
        lines.next(),
        Some("id,name,types,caught,shiny,legendary,captured_at")
    );
    assert_eq!(lines.count(), 5);
}
