use anyhow::{Result, ensure};

use dexcatch_game::{BallKind, StartingStock, Stock};

use super::SimulationScenario;
use crate::logic::{CaptureStrategy, RollPlan, SimulationPlan, SimulationSummary};

fn played_every_turn(summary: &SimulationSummary) -> Result<()> {
    ensure!(summary.metrics.encounters > 0, "no encounter was ever presented");
    let resolved = summary.metrics.captures + summary.metrics.escapes + summary.metrics.flees;
    ensure!(resolved > 0, "no action was ever resolved");
    Ok(())
}

pub fn smoke_scenario() -> SimulationScenario {
    SimulationScenario::new(
        "Smoke",
        SimulationPlan::new(CaptureStrategy::Balanced)
            .with_turns(25)
            .with_expectation(played_every_turn),
    )
    .with_live_replay()
}

fn every_throw_captured(summary: &SimulationSummary) -> Result<()> {
    ensure!(
        summary.metrics.captures == summary.turns.len(),
        "expected {} captures, got {}",
        summary.turns.len(),
        summary.metrics.captures
    );
    ensure!(summary.metrics.escapes == 0, "a forced draw escaped");
    ensure!(
        summary.metrics.encounters == summary.turns.len(),
        "each capture should chain exactly one new encounter"
    );
    Ok(())
}

pub fn forced_success_scenario() -> SimulationScenario {
    SimulationScenario::new(
        "Forced Success",
        SimulationPlan::new(CaptureStrategy::PokeOnly)
            .with_turns(30)
            .with_rolls(RollPlan::Forced(0.0))
            .with_expectation(every_throw_captured),
    )
}

fn refused_without_side_effects(summary: &SimulationSummary) -> Result<()> {
    ensure!(
        summary.metrics.out_of_stock == summary.turns.len(),
        "every Great Ball throw should be refused ({} of {})",
        summary.metrics.out_of_stock,
        summary.turns.len()
    );
    ensure!(summary.metrics.captures == 0, "a refused throw captured");
    ensure!(
        summary.metrics.encounters == 1,
        "a refused throw must keep the encounter"
    );
    ensure!(
        summary.stock(BallKind::Great) == Some(Stock::Count(0)),
        "Great Ball stock moved"
    );
    Ok(())
}

pub fn out_of_stock_scenario() -> SimulationScenario {
    SimulationScenario::new(
        "Out Of Stock",
        SimulationPlan::new(CaptureStrategy::GreatOnly)
            .with_turns(10)
            .with_starting_stock(StartingStock { great: 0, ultra: 1 })
            .with_expectation(refused_without_side_effects),
    )
}

fn bonuses_match_milestones(summary: &SimulationSummary) -> Result<()> {
    let starting = StartingStock::default();
    let total = summary.total_captures;
    ensure!(total >= 100, "only {total} distinct captures; cadence untested");
    let great = starting.great + total / 10;
    let ultra = starting.ultra + total / 100;
    ensure!(
        summary.stock(BallKind::Great) == Some(Stock::Count(great)),
        "expected {great} Great Balls after {total} captures, have {:?}",
        summary.stock(BallKind::Great)
    );
    ensure!(
        summary.stock(BallKind::Ultra) == Some(Stock::Count(ultra)),
        "expected {ultra} Ultra Balls after {total} captures, have {:?}",
        summary.stock(BallKind::Ultra)
    );
    ensure!(
        summary.metrics.great_bonuses == total / 10,
        "bonus notices disagree with the milestone count"
    );
    Ok(())
}

pub fn bonus_cadence_scenario() -> SimulationScenario {
    SimulationScenario::new(
        "Bonus Cadence",
        SimulationPlan::new(CaptureStrategy::PokeOnly)
            .with_turns(160)
            .with_rolls(RollPlan::Forced(0.0))
            .with_expectation(bonuses_match_milestones),
    )
}

fn nothing_slipped_through(summary: &SimulationSummary) -> Result<()> {
    ensure!(summary.metrics.reentry_probes > 0, "no re-entry was probed");
    ensure!(
        summary.metrics.reentry_accepted == 0,
        "{} actions were accepted mid-resolution",
        summary.metrics.reentry_accepted
    );
    Ok(())
}

pub fn mutual_exclusion_scenario() -> SimulationScenario {
    SimulationScenario::new(
        "Mutual Exclusion",
        SimulationPlan::new(CaptureStrategy::Chaotic)
            .with_turns(40)
            .with_reentry_probes()
            .with_expectation(nothing_slipped_through),
    )
    .with_live_replay()
}

fn watchdog_recovered(summary: &SimulationSummary) -> Result<()> {
    ensure!(summary.metrics.stalls > 0, "no resolution was stalled");
    ensure!(
        summary.metrics.watchdog_resets == summary.metrics.stalls,
        "{} stalls but {} watchdog resets",
        summary.metrics.stalls,
        summary.metrics.watchdog_resets
    );
    ensure!(
        summary.metrics.encounters > summary.metrics.stalls,
        "play did not continue after the watchdog fired"
    );
    Ok(())
}

pub fn watchdog_scenario() -> SimulationScenario {
    SimulationScenario::new(
        "Watchdog",
        SimulationPlan::new(CaptureStrategy::Balanced)
            .with_turns(30)
            .with_stall_every(3)
            .with_expectation(watchdog_recovered),
    )
}

fn collection_is_consistent(summary: &SimulationSummary) -> Result<()> {
    let stats = &summary.final_stats;
    ensure!(
        usize::try_from(summary.total_captures).ok() == Some(stats.caught),
        "total captures {} != caught records {}",
        summary.total_captures,
        stats.caught
    );
    ensure!(stats.seen >= stats.caught, "more caught than seen");
    ensure!(
        (0.0..=100.0).contains(&stats.completion_pct),
        "completion {} out of range",
        stats.completion_pct
    );
    ensure!(summary.metrics.flees > 0, "collector never skipped a repeat");
    Ok(())
}

pub fn long_session_scenario() -> SimulationScenario {
    SimulationScenario::new(
        "Long Session",
        SimulationPlan::new(CaptureStrategy::Collector)
            .with_turns(400)
            .with_catalog_size(200)
            .with_expectation(collection_is_consistent),
    )
}
