//! Dexcatch Game Engine
//!
//! Platform-agnostic core logic for the Dexcatch creature collection game.
//! This crate provides encounters, capture resolution, inventory, collection
//! persistence, and export/import without UI or platform-specific dependencies.

pub mod ball;
pub mod catalog;
pub mod clock;
pub mod collection;
pub mod config;
pub mod constants;
pub mod encounter;
pub mod export;
pub mod inventory;
pub mod notice;
pub mod numbers;
pub mod query;
pub mod resolver;
pub mod rolls;
pub mod session;
pub mod storage;

// Re-export commonly used types
pub use ball::{BallKind, UnknownBall};
pub use catalog::{
    CatalogEntry, CatalogError, CatalogSource, DEFAULT_CATALOG_BASE, FixtureCatalog, SpeciesEntry,
    creature_url,
};
pub use clock::{Clock, ManualClock};
pub use collection::{CaptureMark, Collection, CollectionStats, CreatureRecord};
pub use config::{BallMultipliers, CatchConfig, ConfigError, StartingStock};
pub use encounter::{CatalogLookup, Encounter, EncounterGenerator, EncounterRoll, lookup_roll};
pub use export::{ExportEnvelope, ExportFormat, ImportError, export_collection, parse_import};
pub use inventory::{BonusGrant, Inventory, OutOfStock, Stock};
pub use notice::Notice;
pub use query::{CollectionQuery, QueryPage, StatusFilter};
pub use resolver::{
    ActionOutcome, CaptureResolver, Rejection, Resolution, ResolutionResult, ResolutionTicket,
    ResolverState, Stores, capture_probability,
};
pub use rolls::{RngRolls, RollSource, ScriptedRolls};
pub use session::{GameSession, StoreSummary, TurnOutcome};
pub use storage::{
    KeyValueStore, MemoryStore, Persist, Persister, SaveOutcome, SaveReport, SaveStrategy,
    StorageError,
};
