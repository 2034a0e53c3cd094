//! Centralized balance and tuning constants for Dexcatch game logic.
//!
//! These values define the capture math and the encounter cadence. They seed
//! [`crate::config::CatchConfig::default_config`], which hosts may override
//! from JSON.

// Notice keys --------------------------------------------------------------
pub(crate) const NOTICE_NO_ENCOUNTER: &str = "notice.encounter.none";
pub(crate) const NOTICE_ENCOUNTER_APPEARED: &str = "notice.encounter.appeared";
pub(crate) const NOTICE_OUT_OF_STOCK: &str = "notice.capture.out-of-stock";
pub(crate) const NOTICE_CAPTURE_SUCCESS: &str = "notice.capture.success";
pub(crate) const NOTICE_CAPTURE_ESCAPED: &str = "notice.capture.escaped";
pub(crate) const NOTICE_FLED: &str = "notice.encounter.fled";
pub(crate) const NOTICE_BONUS_GRANTED: &str = "notice.inventory.bonus";
pub(crate) const NOTICE_WATCHDOG_RESET: &str = "notice.resolver.watchdog";
pub(crate) const NOTICE_SAVE_DEGRADED: &str = "notice.storage.degraded";
pub(crate) const NOTICE_SAVE_FAILED: &str = "notice.storage.failed";
pub(crate) const NOTICE_IMPORT_OK: &str = "notice.import.ok";
pub(crate) const NOTICE_IMPORT_REJECTED: &str = "notice.import.rejected";
pub(crate) const NOTICE_RESET: &str = "notice.collection.reset";

// Capture tuning -----------------------------------------------------------
pub(crate) const BASE_CATCH_RATE: f64 = 0.4;
pub(crate) const POKE_MULTIPLIER: f64 = 1.0;
pub(crate) const GREAT_MULTIPLIER: f64 = 1.5;
pub(crate) const ULTRA_MULTIPLIER: f64 = 2.2;
pub(crate) const REPEAT_CAPTURE_PENALTY: f64 = 0.1;
pub(crate) const MAX_CATCH_PROBABILITY: f64 = 0.98;
pub(crate) const GUARANTEED_CATCH_PROBABILITY: f64 = 1.0;

// Inventory tuning ---------------------------------------------------------
pub(crate) const STARTING_GREAT_BALLS: u32 = 2;
pub(crate) const STARTING_ULTRA_BALLS: u32 = 1;
pub(crate) const GREAT_BONUS_EVERY: u32 = 10;
pub(crate) const ULTRA_BONUS_EVERY: u32 = 100;
/// Persisted sentinel for an unlimited stock.
pub const UNLIMITED_SENTINEL: i64 = -1;

// Encounter tuning ---------------------------------------------------------
pub(crate) const CATALOG_SIZE: u32 = 1025;
pub(crate) const SHINY_ODDS: u32 = 300;

// Resolver tuning ----------------------------------------------------------
pub(crate) const WATCHDOG_MS: u64 = 6_000;

// Persistence --------------------------------------------------------------
pub(crate) const STORAGE_PREFIX: &str = "dexcatch";
pub(crate) const COLLECTION_KEY_SUFFIX: &str = "collection";
pub(crate) const INVENTORY_KEY_SUFFIX: &str = "inventory";

// Export -------------------------------------------------------------------
pub const EXPORT_FORMAT_TAG: &str = "dexcatch.collection";
pub const EXPORT_VERSION: u32 = 1;
pub(crate) const CSV_HEADER: &str = "id,name,types,caught,shiny,legendary,captured_at";

// Query --------------------------------------------------------------------
pub(crate) const DEFAULT_PAGE_SIZE: usize = 24;
