//! Read-only creature catalog: the REST schema subset the game consumes and
//! the source trait hosts implement over their own transport.
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Default public catalog endpoint.
pub const DEFAULT_CATALOG_BASE: &str = "https://pokeapi.co/api/v2";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    #[error("network error: {0}")]
    Network(String),
    #[error("catalog returned status {0}")]
    Status(u16),
    #[error("could not decode catalog payload: {0}")]
    Decode(String),
    #[error("creature {0} not found")]
    NotFound(u32),
}

impl From<serde_json::Error> for CatalogError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NamedResource {
    pub name: String,
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Sprites {
    #[serde(default)]
    pub front_default: Option<String>,
    #[serde(default)]
    pub front_shiny: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeSlot {
    #[serde(default)]
    pub slot: u8,
    #[serde(rename = "type")]
    pub kind: NamedResource,
}

/// A creature as returned by `GET {base}/pokemon/{id}`. Unknown fields are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub sprites: Sprites,
    #[serde(default)]
    pub types: Vec<TypeSlot>,
    #[serde(default)]
    pub species: Option<NamedResource>,
}

impl CatalogEntry {
    /// Parse an entry from a catalog response body.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Decode`] if the body does not match the schema.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Type tags ordered by slot with duplicates removed.
    #[must_use]
    pub fn type_names(&self) -> Vec<String> {
        let mut slots: Vec<&TypeSlot> = self.types.iter().collect();
        slots.sort_by_key(|slot| slot.slot);
        let mut names: Vec<String> = Vec::with_capacity(slots.len());
        for slot in slots {
            if !names.contains(&slot.kind.name) {
                names.push(slot.kind.name.clone());
            }
        }
        names
    }

    #[must_use]
    pub fn species_url(&self) -> Option<&str> {
        self.species
            .as_ref()
            .map(|species| species.url.as_str())
            .filter(|url| !url.is_empty())
    }
}

/// Extended metadata from the species endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SpeciesEntry {
    #[serde(default)]
    pub is_legendary: bool,
    #[serde(default)]
    pub is_mythical: bool,
}

impl SpeciesEntry {
    /// Parse species metadata from a catalog response body.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Decode`] if the body is not valid JSON.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        Ok(serde_json::from_str(json)?)
    }
}

#[must_use]
pub fn creature_url(base: &str, id: u32) -> String {
    format!("{}/pokemon/{id}", base.trim_end_matches('/'))
}

/// Async catalog access. Futures are not required to be `Send` so browser
/// hosts can implement this over `fetch`.
#[async_trait(?Send)]
pub trait CatalogSource {
    /// Fetch a creature by identifier.
    async fn creature(&self, id: u32) -> Result<CatalogEntry, CatalogError>;

    /// Fetch the species metadata linked from `entry`.
    async fn species(&self, entry: &CatalogEntry) -> Result<SpeciesEntry, CatalogError>;
}

/// In-memory catalog for offline play and tests.
#[derive(Debug, Clone, Default)]
pub struct FixtureCatalog {
    entries: HashMap<u32, CatalogEntry>,
    species: HashMap<u32, SpeciesEntry>,
}

const FIXTURE_TYPES: [&str; 6] = ["normal", "fire", "water", "grass", "electric", "psychic"];

impl FixtureCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Deterministic catalog of `size` creatures. Every 50th is legendary and
    /// every 7th lacks a shiny sprite.
    #[must_use]
    pub fn generated(size: u32) -> Self {
        let mut catalog = Self::new();
        for id in 1..=size {
            let primary = FIXTURE_TYPES[(id as usize) % FIXTURE_TYPES.len()];
            let secondary = FIXTURE_TYPES[(id as usize / 3) % FIXTURE_TYPES.len()];
            let mut types = vec![TypeSlot {
                slot: 1,
                kind: NamedResource {
                    name: primary.to_string(),
                    url: String::new(),
                },
            }];
            if secondary != primary {
                types.push(TypeSlot {
                    slot: 2,
                    kind: NamedResource {
                        name: secondary.to_string(),
                        url: String::new(),
                    },
                });
            }
            let entry = CatalogEntry {
                id,
                name: format!("creature-{id}"),
                sprites: Sprites {
                    front_default: Some(format!("fixture://sprites/{id}.png")),
                    front_shiny: (id % 7 != 0).then(|| format!("fixture://sprites/shiny/{id}.png")),
                },
                types,
                species: Some(NamedResource {
                    name: format!("creature-{id}"),
                    url: format!("fixture://species/{id}"),
                }),
            };
            catalog.insert(
                entry,
                Some(SpeciesEntry {
                    is_legendary: id % 50 == 0,
                    is_mythical: false,
                }),
            );
        }
        catalog
    }

    /// Add or replace an entry. `None` species makes the species lookup fail.
    pub fn insert(&mut self, entry: CatalogEntry, species: Option<SpeciesEntry>) {
        let id = entry.id;
        self.entries.insert(id, entry);
        match species {
            Some(species) => {
                self.species.insert(id, species);
            }
            None => {
                self.species.remove(&id);
            }
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait(?Send)]
impl CatalogSource for FixtureCatalog {
    async fn creature(&self, id: u32) -> Result<CatalogEntry, CatalogError> {
        self.entries
            .get(&id)
            .cloned()
            .ok_or(CatalogError::NotFound(id))
    }

    async fn species(&self, entry: &CatalogEntry) -> Result<SpeciesEntry, CatalogError> {
        self.species
            .get(&entry.id)
            .copied()
            .ok_or(CatalogError::NotFound(entry.id))
    }
}
