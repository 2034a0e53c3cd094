//! Collection export (JSON envelope, CSV) and validated import.
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::hash::Hasher;
use std::str::FromStr;
use twox_hash::XxHash64;

use crate::collection::{Collection, CreatureRecord};
use crate::constants::{CSV_HEADER, EXPORT_FORMAT_TAG, EXPORT_VERSION};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Json,
    Csv,
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            other => Err(format!("unknown export format: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ImportError {
    #[error("import data is empty")]
    Empty,
    #[error("import data is not valid JSON: {0}")]
    Malformed(String),
    #[error("unexpected export format tag: {0}")]
    WrongFormat(String),
    #[error("unsupported export version {0}")]
    UnsupportedVersion(u32),
    #[error("checksum does not match records")]
    ChecksumMismatch,
    #[error("record {id} is invalid: {reason}")]
    InvalidRecord { id: u32, reason: String },
    #[error("record {0} appears more than once")]
    DuplicateId(u32),
}

/// Versioned export wrapper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportEnvelope {
    pub format: String,
    pub version: u32,
    #[serde(default)]
    pub exported_at: u64,
    /// Hex XxHash64 of the serialized `records`.
    #[serde(default)]
    pub checksum: Option<String>,
    pub records: Vec<CreatureRecord>,
}

fn records_checksum(records: &[CreatureRecord]) -> String {
    let bytes = serde_json::to_vec(records).unwrap_or_default();
    let mut hasher = XxHash64::with_seed(0);
    hasher.write(&bytes);
    format!("{:016x}", hasher.finish())
}

/// Serialize the collection as a pretty JSON envelope.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn export_json(collection: &Collection, now_ms: u64) -> Result<String, serde_json::Error> {
    let records: Vec<CreatureRecord> = collection.records().cloned().collect();
    let envelope = ExportEnvelope {
        format: EXPORT_FORMAT_TAG.to_string(),
        version: EXPORT_VERSION,
        exported_at: now_ms,
        checksum: Some(records_checksum(&records)),
        records,
    };
    serde_json::to_string_pretty(&envelope)
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// One row per record; types are `|`-joined and an empty `captured_at` means never caught.
#[must_use]
pub fn export_csv(collection: &Collection) -> String {
    let mut out = String::from(CSV_HEADER);
    out.push('\n');
    for record in collection.records() {
        let captured_at = record
            .captured_at
            .map(|ts| ts.to_string())
            .unwrap_or_default();
        let _ = writeln!(
            out,
            "{},{},{},{},{},{},{}",
            record.id,
            csv_field(&record.name),
            csv_field(&record.types.join("|")),
            record.caught,
            record.shiny,
            record.is_legendary,
            captured_at
        );
    }
    out
}

/// Export in the requested format.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn export_collection(
    collection: &Collection,
    format: ExportFormat,
    now_ms: u64,
) -> Result<String, serde_json::Error> {
    match format {
        ExportFormat::Json => export_json(collection, now_ms),
        ExportFormat::Csv => Ok(export_csv(collection)),
    }
}

fn decode<T: serde::de::DeserializeOwned>(value: Value) -> Result<T, ImportError> {
    serde_json::from_value(value).map_err(|err| ImportError::Malformed(err.to_string()))
}

fn validate_records(
    records: Vec<CreatureRecord>,
    catalog_size: u32,
) -> Result<Collection, ImportError> {
    let mut seen = BTreeMap::new();
    for record in records {
        if record.id == 0 || record.id > catalog_size {
            return Err(ImportError::InvalidRecord {
                id: record.id,
                reason: format!("id outside 1..={catalog_size}"),
            });
        }
        if record.name.trim().is_empty() {
            return Err(ImportError::InvalidRecord {
                id: record.id,
                reason: "name is empty".into(),
            });
        }
        if let Some(dup) = record
            .types
            .iter()
            .enumerate()
            .find_map(|(i, kind)| record.types[..i].contains(kind).then_some(kind))
        {
            return Err(ImportError::InvalidRecord {
                id: record.id,
                reason: format!("duplicate type {dup}"),
            });
        }
        if !record.caught && record.captured_at.is_some() {
            return Err(ImportError::InvalidRecord {
                id: record.id,
                reason: "captured_at set on an uncaught record".into(),
            });
        }
        if seen.insert(record.id, record.clone()).is_some() {
            return Err(ImportError::DuplicateId(record.id));
        }
    }
    Ok(Collection::from_records(seen.into_values()))
}

/// Parse and validate imported text.
///
/// Accepts an [`ExportEnvelope`], a bare array of records, or the persisted
/// id-keyed map.
///
/// # Errors
///
/// Returns an [`ImportError`] describing the first problem found.
pub fn parse_import(text: &str, catalog_size: u32) -> Result<Collection, ImportError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(ImportError::Empty);
    }
    let value: Value =
        serde_json::from_str(text).map_err(|err| ImportError::Malformed(err.to_string()))?;
    let records = match value {
        Value::Array(_) => decode::<Vec<CreatureRecord>>(value)?,
        Value::Object(map) if map.contains_key("records") => {
            let envelope: ExportEnvelope = decode(Value::Object(map))?;
            if envelope.format != EXPORT_FORMAT_TAG {
                return Err(ImportError::WrongFormat(envelope.format));
            }
            if envelope.version == 0 || envelope.version > EXPORT_VERSION {
                return Err(ImportError::UnsupportedVersion(envelope.version));
            }
            if let Some(expected) = &envelope.checksum
                && *expected != records_checksum(&envelope.records)
            {
                return Err(ImportError::ChecksumMismatch);
            }
            envelope.records
        }
        Value::Object(map) => {
            let mut records = Vec::with_capacity(map.len());
            for (key, entry) in map {
                let record: CreatureRecord = decode(entry)?;
                if key.parse::<u32>().ok() != Some(record.id) {
                    return Err(ImportError::InvalidRecord {
                        id: record.id,
                        reason: format!("stored under mismatched key {key}"),
                    });
                }
                records.push(record);
            }
            records
        }
        _ => {
            return Err(ImportError::Malformed(
                "expected an object or an array".into(),
            ));
        }
    };
    validate_records(records, catalog_size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encounter::Encounter;

    fn sample() -> Collection {
        let mut collection = Collection::new();
        let mut mime = Encounter::placeholder(122);
        mime.name = "mr-mime, the mime".into();
        mime.types = vec!["psychic".into(), "fairy".into()];
        collection.mark_caught(&mime, 1_700_000_000_000);
        collection.observe(&Encounter::placeholder(7));
        collection
    }

    #[test]
    fn json_export_reimports_identically() {
        let collection = sample();
        let text = export_json(&collection, 99).unwrap();
        assert!(text.contains(EXPORT_FORMAT_TAG));
        let imported = parse_import(&text, 1025).unwrap();
        assert_eq!(imported, collection);
    }

    #[test]
    fn csv_export_quotes_fields() {
        let csv = export_csv(&sample());
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], CSV_HEADER);
        assert_eq!(lines[1], "7,#7,,false,false,false,");
        assert_eq!(
            lines[2],
            "122,\"mr-mime, the mime\",psychic|fairy,true,false,false,1700000000000"
        );
    }

    #[test]
    fn tampered_checksum_is_rejected() {
        let text = export_json(&sample(), 1).unwrap();
        let tampered = text.replace("\"caught\": true", "\"caught\": false");
        assert_ne!(text, tampered);
        let err = parse_import(&tampered, 1025).unwrap_err();
        assert!(matches!(
            err,
            ImportError::ChecksumMismatch | ImportError::InvalidRecord { .. }
        ));
    }

    #[test]
    fn rejects_bad_shapes_and_records() {
        assert_eq!(parse_import("   ", 10), Err(ImportError::Empty));
        assert!(matches!(parse_import("{oops", 10), Err(ImportError::Malformed(_))));
        assert!(matches!(parse_import("42", 10), Err(ImportError::Malformed(_))));
        assert!(matches!(
            parse_import(r#"[{ "id": 11, "name": "x" }]"#, 10),
            Err(ImportError::InvalidRecord { id: 11, .. })
        ));
        assert!(matches!(
            parse_import(r#"[{ "id": 1, "name": " " }]"#, 10),
            Err(ImportError::InvalidRecord { id: 1, .. })
        ));
        assert!(matches!(
            parse_import(
                r#"[{ "id": 1, "name": "a", "types": ["fire", "fire"], "caught": true, "captured_at": 1 }]"#,
                10
            ),
            Err(ImportError::InvalidRecord { id: 1, .. })
        ));
        assert_eq!(
            parse_import(r#"[{ "id": 2, "name": "a" }, { "id": 2, "name": "b" }]"#, 10),
            Err(ImportError::DuplicateId(2))
        );
        assert!(matches!(
            parse_import(r#"{ "format": "other", "version": 1, "records": [] }"#, 10),
            Err(ImportError::WrongFormat(_))
        ));
        assert_eq!(
            parse_import(
                r#"{ "format": "dexcatch.collection", "version": 9, "records": [] }"#,
                10
            ),
            Err(ImportError::UnsupportedVersion(9))
        );
    }

    #[test]
    fn accepts_persisted_map_and_bare_arrays() {
        let collection = sample();
        let stored = serde_json::to_string(&collection).unwrap();
        assert_eq!(parse_import(&stored, 1025).unwrap(), collection);

        let bare = r#"[{ "id": 4, "name": "charmander", "caught": true, "captured_at": 5 }]"#;
        let imported = parse_import(bare, 1025).unwrap();
        assert!(imported.is_caught(4));

        let mismatched = r#"{ "5": { "id": 4, "name": "charmander" } }"#;
        assert!(matches!(
            parse_import(mismatched, 1025),
            Err(ImportError::InvalidRecord { id: 4, .. })
        ));
    }
}
