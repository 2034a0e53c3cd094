//! Encounter generation: identifier and shiny rolls, catalog realisation, and
//! single-flight request tracking.
use serde::{Deserialize, Serialize};

use crate::catalog::{CatalogEntry, CatalogError, CatalogSource, SpeciesEntry};
use crate::config::CatchConfig;
use crate::rolls::RollSource;

/// A creature currently available for capture or flight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Encounter {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub sprite: Option<String>,
    #[serde(default)]
    pub types: Vec<String>,
    #[serde(default)]
    pub shiny: bool,
    #[serde(default)]
    pub is_legendary: bool,
}

impl Encounter {
    /// Placeholder used when the catalog cannot be reached.
    #[must_use]
    pub fn placeholder(id: u32) -> Self {
        Self {
            id,
            name: format!("#{id}"),
            sprite: None,
            types: Vec::new(),
            shiny: false,
            is_legendary: false,
        }
    }
}

/// An outstanding encounter request. Holding one blocks further requests
/// until it is fulfilled or abandoned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncounterRoll {
    ticket: u64,
    pub id: u32,
    /// The shiny roll hit; realised only if a shiny sprite exists.
    pub shiny_roll: bool,
}

/// Catalog results for a roll. Failures are kept so hosts can log them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogLookup {
    pub entry: Result<CatalogEntry, CatalogError>,
    /// `None` when the entry itself failed and species was never queried.
    pub species: Option<Result<SpeciesEntry, CatalogError>>,
}

impl CatalogLookup {
    #[must_use]
    pub const fn found(entry: CatalogEntry, species: Result<SpeciesEntry, CatalogError>) -> Self {
        Self {
            entry: Ok(entry),
            species: Some(species),
        }
    }

    #[must_use]
    pub const fn unavailable(err: CatalogError) -> Self {
        Self {
            entry: Err(err),
            species: None,
        }
    }

    fn legendary(&self) -> bool {
        match &self.species {
            Some(Ok(species)) => species.is_legendary,
            Some(Err(err)) => {
                log::debug!("legendary lookup failed, assuming non-legendary: {err}");
                false
            }
            None => false,
        }
    }
}

/// Fetch the catalog data for `roll`. Never fails; errors land in the lookup.
pub async fn lookup_roll<S>(source: &S, roll: &EncounterRoll) -> CatalogLookup
where
    S: CatalogSource + ?Sized,
{
    match source.creature(roll.id).await {
        Ok(entry) => {
            let species = source.species(&entry).await;
            CatalogLookup::found(entry, species)
        }
        Err(err) => CatalogLookup::unavailable(err),
    }
}

#[derive(Debug, Clone)]
pub struct EncounterGenerator {
    catalog_size: u32,
    shiny_odds: u32,
    in_flight: Option<u64>,
    next_ticket: u64,
}

impl EncounterGenerator {
    #[must_use]
    pub fn new(config: &CatchConfig) -> Self {
        Self {
            catalog_size: config.catalog_size.max(1),
            shiny_odds: config.shiny_odds.max(1),
            in_flight: None,
            next_ticket: 1,
        }
    }

    #[must_use]
    pub const fn is_pending(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Roll a new encounter. Returns `None` while another request is outstanding.
    pub fn request<D: RollSource + ?Sized>(&mut self, rolls: &mut D) -> Option<EncounterRoll> {
        if self.in_flight.is_some() {
            log::debug!("encounter request suppressed: one already in flight");
            return None;
        }
        let id = rolls.between(1, self.catalog_size);
        // One winning face out of `shiny_odds`.
        let shiny_roll = rolls.between(1, self.shiny_odds) == self.shiny_odds;
        let ticket = self.next_ticket;
        self.next_ticket = self.next_ticket.wrapping_add(1);
        self.in_flight = Some(ticket);
        Some(EncounterRoll {
            ticket,
            id,
            shiny_roll,
        })
    }

    /// Realise `roll` from catalog data. Returns `None` for a stale roll.
    pub fn fulfill(&mut self, roll: &EncounterRoll, lookup: &CatalogLookup) -> Option<Encounter> {
        if self.in_flight != Some(roll.ticket) {
            log::warn!("ignoring stale encounter roll for #{}", roll.id);
            return None;
        }
        self.in_flight = None;
        let encounter = match &lookup.entry {
            Ok(entry) => realise(roll, entry, lookup.legendary()),
            Err(err) => {
                log::warn!("catalog unavailable for #{}: {err}", roll.id);
                Encounter::placeholder(roll.id)
            }
        };
        Some(encounter)
    }

    /// Release the in-flight slot without producing an encounter.
    pub fn abandon(&mut self, roll: &EncounterRoll) {
        if self.in_flight == Some(roll.ticket) {
            self.in_flight = None;
        }
    }
}

fn realise(roll: &EncounterRoll, entry: &CatalogEntry, is_legendary: bool) -> Encounter {
    let shiny_sprite = entry.sprites.front_shiny.clone().filter(|_| roll.shiny_roll);
    let shiny = shiny_sprite.is_some();
    let sprite = shiny_sprite.or_else(|| entry.sprites.front_default.clone());
    Encounter {
        id: roll.id,
        name: entry.name.clone(),
        sprite,
        types: entry.type_names(),
        shiny,
        is_legendary,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::FixtureCatalog;
    use crate::rolls::ScriptedRolls;
    use futures::executor::block_on;

    fn generator(shiny_odds: u32) -> EncounterGenerator {
        EncounterGenerator::new(&CatchConfig {
            catalog_size: 100,
            shiny_odds,
            ..CatchConfig::default_config()
        })
    }

    #[test]
    fn request_is_single_flight() {
        let mut generator = generator(300);
        let mut rolls = ScriptedRolls::fixed(0.5).with_picks([42, 1]);
        let roll = generator.request(&mut rolls).expect("first request");
        assert_eq!(roll.id, 42);
        assert!(!roll.shiny_roll);
        assert!(generator.request(&mut rolls).is_none());
        generator.abandon(&roll);
        assert!(generator.request(&mut rolls).is_some());
    }

    #[test]
    fn shiny_realised_only_with_shiny_sprite() {
        let catalog = FixtureCatalog::generated(100);
        let mut generator = generator(300);

        let mut rolls = ScriptedRolls::fixed(0.5).with_picks([14, 300]);
        let roll = generator.request(&mut rolls).unwrap();
        assert!(roll.shiny_roll);
        let lookup = block_on(lookup_roll(&catalog, &roll));
        let encounter = generator.fulfill(&roll, &lookup).unwrap();
        assert!(!encounter.shiny, "#14 has no shiny sprite in the fixture");
        assert_eq!(encounter.sprite.as_deref(), Some("fixture://sprites/14.png"));

        let mut rolls = ScriptedRolls::fixed(0.5).with_picks([15, 300]);
        let roll = generator.request(&mut rolls).unwrap();
        let lookup = block_on(lookup_roll(&catalog, &roll));
        let encounter = generator.fulfill(&roll, &lookup).unwrap();
        assert!(encounter.shiny);
        assert_eq!(
            encounter.sprite.as_deref(),
            Some("fixture://sprites/shiny/15.png")
        );
    }

    #[test]
    fn species_failure_defaults_to_non_legendary() {
        let mut catalog = FixtureCatalog::generated(100);
        let entry = block_on(catalog.creature(50)).unwrap();
        catalog.insert(entry, None);
        let mut generator = generator(300);
        let mut rolls = ScriptedRolls::fixed(0.5).with_picks([50]);
        let roll = generator.request(&mut rolls).unwrap();
        let lookup = block_on(lookup_roll(&catalog, &roll));
        let encounter = generator.fulfill(&roll, &lookup).unwrap();
        assert!(!encounter.is_legendary);
        assert_eq!(encounter.name, "creature-50");
    }

    #[test]
    fn unavailable_catalog_degrades_to_placeholder() {
        let catalog = FixtureCatalog::new();
        let mut generator = generator(1);
        let mut rolls = ScriptedRolls::fixed(0.5).with_picks([9]);
        let roll = generator.request(&mut rolls).unwrap();
        let lookup = block_on(lookup_roll(&catalog, &roll));
        assert!(lookup.species.is_none());
        let encounter = generator.fulfill(&roll, &lookup).unwrap();
        assert_eq!(encounter, Encounter::placeholder(9));
        assert!(!generator.is_pending());
    }

    #[test]
    fn stale_roll_is_rejected() {
        let mut generator = generator(300);
        let mut rolls = ScriptedRolls::fixed(0.5);
        let first = generator.request(&mut rolls).unwrap();
        generator.abandon(&first);
        let second = generator.request(&mut rolls).unwrap();
        let lookup = CatalogLookup::unavailable(CatalogError::Network("offline".into()));
        assert!(generator.fulfill(&first, &lookup).is_none());
        assert!(generator.fulfill(&second, &lookup).is_some());
    }
}
