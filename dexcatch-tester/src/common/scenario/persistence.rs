use anyhow::{Result, ensure};

use dexcatch_game::{ExportFormat, Stores};

use super::SimulationScenario;
use crate::logic::{CaptureStrategy, RollPlan, SimSession, SimulationPlan, SimulationSummary, StorePlan};

/// Per-value quota small enough that a few dozen records overflow it.
const TIGHT_QUOTA_BYTES: usize = 4_096;

fn degraded_but_playing(summary: &SimulationSummary) -> Result<()> {
    ensure!(
        summary.metrics.degraded_saves > 0,
        "quota never forced a degraded save"
    );
    ensure!(
        summary.metrics.captures == summary.turns.len(),
        "storage pressure interrupted play"
    );
    Ok(())
}

fn reload_survives_degradation(session: &mut SimSession) -> Result<()> {
    let reloaded = Stores::load(session.store().clone(), session.config());
    ensure!(
        !reloaded.collection.is_empty(),
        "nothing survived the degraded saves"
    );
    for record in reloaded.collection.records() {
        let Some(live) = session.collection().get(record.id) else {
            anyhow::bail!("reloaded record #{} was never seen", record.id);
        };
        ensure!(
            !record.caught || live.caught,
            "reloaded #{} as caught but it is not",
            record.id
        );
    }
    ensure!(
        &reloaded.inventory == session.inventory(),
        "inventory should always fit and persist in full"
    );
    Ok(())
}

pub fn degraded_save_scenario() -> SimulationScenario {
    SimulationScenario::new(
        "Degraded Save",
        SimulationPlan::new(CaptureStrategy::PokeOnly)
            .with_turns(120)
            .with_catalog_size(300)
            .with_rolls(RollPlan::Forced(0.0))
            .with_store(StorePlan::ValueLimit(TIGHT_QUOTA_BYTES))
            .with_finale(reload_survives_degradation)
            .with_expectation(degraded_but_playing),
    )
}

const MALFORMED_IMPORTS: &[&str] = &[
    "",
    "not json",
    "42",
    r#"[{"id":0,"name":"zero"}]"#,
    r#"[{"id":5000,"name":"far-away"}]"#,
    r#"[{"id":1,"name":"  "}]"#,
    r#"[{"id":5,"name":"a"},{"id":5,"name":"b"}]"#,
    r#"[{"id":3,"name":"c","caught":false,"captured_at":5}]"#,
    r#"{"format":"other","version":1,"records":[]}"#,
    r#"{"format":"dexcatch.collection","version":99,"records":[]}"#,
    r#"{"format":"dexcatch.collection","version":1,"checksum":"0000000000000000","records":[]}"#,
];

/// Seed the collection from a legacy id-keyed save before play starts. The
/// record is uncaught so the capture counter stays consistent.
fn seed_legacy_save(session: &mut SimSession) {
    let legacy = r#"{"25":{"id":25,"name":"sparky","types":["electric"]}}"#;
    if let Err(err) = session.import_collection(legacy) {
        log::warn!("legacy seed rejected: {err}");
    }
}

fn malformed_imports_are_harmless(session: &mut SimSession) -> Result<()> {
    let before = session.collection().clone();
    ensure!(before.get(25).is_some(), "legacy seed record is missing");

    for text in MALFORMED_IMPORTS {
        ensure!(
            session.import_collection(text).is_err(),
            "accepted malformed import {text:?}"
        );
        ensure!(
            session.collection() == &before,
            "rejected import {text:?} changed the collection"
        );
    }

    let exported = session.export_collection(ExportFormat::Json)?;
    let replaced = session.import_collection(r#"[{"id":1,"name":"solo"}]"#)?;
    ensure!(replaced.records == 1, "import should replace the collection");
    session.import_collection(&exported)?;
    ensure!(
        session.collection() == &before,
        "exported collection did not round-trip"
    );
    Ok(())
}

fn import_notices_tallied(summary: &SimulationSummary) -> Result<()> {
    let count = |key: &str| summary.metrics.notices.get(key).copied().unwrap_or(0);
    ensure!(
        count("notice.import.rejected") == MALFORMED_IMPORTS.len(),
        "expected {} rejection notices, saw {}",
        MALFORMED_IMPORTS.len(),
        count("notice.import.rejected")
    );
    ensure!(
        count("notice.import.ok") >= 2,
        "successful imports were not announced"
    );
    Ok(())
}

pub fn import_malformed_scenario() -> SimulationScenario {
    SimulationScenario::new(
        "Import Malformed",
        SimulationPlan::new(CaptureStrategy::Balanced)
            .with_turns(20)
            .with_setup(seed_legacy_save)
            .with_finale(malformed_imports_are_harmless)
            .with_expectation(import_notices_tallied),
    )
}
