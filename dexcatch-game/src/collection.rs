//! Collection store: every creature the player has seen, keyed by identifier.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::encounter::Encounter;
use crate::numbers::percent_of;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatureRecord {
    pub id: u32,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub types: Vec<String>,
    #[serde(default)]
    pub caught: bool,
    #[serde(default)]
    pub is_legendary: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sprite: Option<String>,
    /// Epoch millis of the first capture. Never overwritten by recaptures.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub captured_at: Option<u64>,
    #[serde(default)]
    pub shiny: bool,
}

impl CreatureRecord {
    /// Uncaught record carrying the encounter's display data.
    #[must_use]
    pub fn observed(encounter: &Encounter) -> Self {
        Self {
            id: encounter.id,
            name: encounter.name.clone(),
            types: encounter.types.clone(),
            caught: false,
            is_legendary: encounter.is_legendary,
            // A shiny variant only sticks once it is caught.
            sprite: encounter.sprite.clone().filter(|_| !encounter.shiny),
            captured_at: None,
            shiny: false,
        }
    }
}

/// Result of marking a creature caught.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureMark {
    /// The creature had never been caught before.
    pub first_capture: bool,
    pub captured_at: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CollectionStats {
    pub seen: usize,
    pub caught: usize,
    pub shiny: usize,
    pub legendary: usize,
    pub catalog_size: u32,
    pub completion_pct: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Collection {
    records: BTreeMap<u32, CreatureRecord>,
}

impl Collection {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from records; later duplicates win.
    #[must_use]
    pub fn from_records(records: impl IntoIterator<Item = CreatureRecord>) -> Self {
        Self {
            records: records.into_iter().map(|r| (r.id, r)).collect(),
        }
    }

    #[must_use]
    pub fn get(&self, id: u32) -> Option<&CreatureRecord> {
        self.records.get(&id)
    }

    #[must_use]
    pub fn is_caught(&self, id: u32) -> bool {
        self.records.get(&id).is_some_and(|r| r.caught)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> impl Iterator<Item = &CreatureRecord> {
        self.records.values()
    }

    /// Record that `encounter` was seen. Existing records are left untouched.
    pub fn observe(&mut self, encounter: &Encounter) {
        self.records
            .entry(encounter.id)
            .or_insert_with(|| CreatureRecord::observed(encounter));
    }

    /// Upsert the record for `encounter` and mark it caught.
    pub fn mark_caught(&mut self, encounter: &Encounter, now_ms: u64) -> CaptureMark {
        let record = self
            .records
            .entry(encounter.id)
            .or_insert_with(|| CreatureRecord::observed(encounter));
        let first_capture = !record.caught;
        record.caught = true;
        let captured_at = *record.captured_at.get_or_insert(now_ms);
        if record.name.is_empty() {
            record.name.clone_from(&encounter.name);
        }
        if record.types.is_empty() {
            record.types.clone_from(&encounter.types);
        }
        record.is_legendary |= encounter.is_legendary;
        if encounter.shiny {
            record.shiny = true;
            record.sprite.clone_from(&encounter.sprite);
        } else if record.sprite.is_none() || (!record.shiny && encounter.sprite.is_some()) {
            record.sprite.clone_from(&encounter.sprite);
        }
        CaptureMark {
            first_capture,
            captured_at,
        }
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// Copy without sprite references.
    #[must_use]
    pub fn without_sprites(&self) -> Self {
        let mut compact = self.clone();
        for record in compact.records.values_mut() {
            record.sprite = None;
        }
        compact
    }

    /// Caught records only, reduced to identity and capture metadata.
    #[must_use]
    pub fn caught_metadata(&self) -> Self {
        Self {
            records: self
                .records
                .values()
                .filter(|r| r.caught)
                .map(|r| {
                    (
                        r.id,
                        CreatureRecord {
                            id: r.id,
                            name: r.name.clone(),
                            types: Vec::new(),
                            caught: true,
                            is_legendary: r.is_legendary,
                            sprite: None,
                            captured_at: r.captured_at,
                            shiny: r.shiny,
                        },
                    )
                })
                .collect(),
        }
    }

    #[must_use]
    pub fn stats(&self, catalog_size: u32) -> CollectionStats {
        let caught: Vec<&CreatureRecord> = self.records.values().filter(|r| r.caught).collect();
        CollectionStats {
            seen: self.records.len(),
            caught: caught.len(),
            shiny: caught.iter().filter(|r| r.shiny).count(),
            legendary: caught.iter().filter(|r| r.is_legendary).count(),
            catalog_size,
            completion_pct: percent_of(caught.len(), catalog_size),
        }
    }
}
