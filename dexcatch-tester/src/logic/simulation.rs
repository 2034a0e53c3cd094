use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use dexcatch_game::{
    ActionOutcome, BallKind, CatalogSource, CatchConfig, CollectionStats, EncounterRoll,
    GameSession, ManualClock, MemoryStore, Notice, Rejection, ResolutionResult, RngRolls,
    RollSource, StartingStock, Stock, lookup_roll,
};
use rand_chacha::ChaCha20Rng;

use super::policy::{CaptureStrategy, PolicyAction, PolicyView};

/// Session type every simulation drives.
pub type SimSession = GameSession<MemoryStore, SimRolls, ManualClock>;

/// Simulated wall clock start (2024-01-01T00:00:00Z).
pub const SIM_EPOCH_MS: u64 = 1_704_067_200_000;
/// Delay between accepting an action and completing it.
pub const DEFAULT_SETTLE_MS: u64 = 450;
pub const DEFAULT_TURNS: usize = 40;

/// How capture draws are produced.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RollPlan {
    Seeded,
    /// Every capture draw returns the value; encounter picks stay seeded.
    Forced(f64),
}

pub enum SimRolls {
    Seeded(RngRolls<ChaCha20Rng>),
    Forced {
        unit: f64,
        picks: RngRolls<ChaCha20Rng>,
    },
}

impl SimRolls {
    #[must_use]
    pub fn new(plan: RollPlan, seed: u64) -> Self {
        match plan {
            RollPlan::Seeded => Self::Seeded(RngRolls::seeded(seed)),
            RollPlan::Forced(unit) => Self::Forced {
                unit,
                picks: RngRolls::seeded(seed),
            },
        }
    }
}

impl RollSource for SimRolls {
    fn unit(&mut self) -> f64 {
        match self {
            Self::Seeded(rolls) => rolls.unit(),
            Self::Forced { unit, .. } => *unit,
        }
    }

    fn between(&mut self, low: u32, high: u32) -> u32 {
        match self {
            Self::Seeded(rolls) | Self::Forced { picks: rolls, .. } => rolls.between(low, high),
        }
    }
}

/// Backing store behaviour for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorePlan {
    Unbounded,
    /// Writes larger than this many bytes fail with a quota error.
    ValueLimit(usize),
    FailingWrites,
}

impl StorePlan {
    fn build(self) -> MemoryStore {
        match self {
            Self::Unbounded => MemoryStore::new(),
            Self::ValueLimit(bytes) => MemoryStore::new().with_value_limit(bytes),
            Self::FailingWrites => {
                let mut store = MemoryStore::new();
                store.set_fail_writes(true);
                store
            }
        }
    }
}

/// Assertion hook run after a simulation completes.
type SimulationExpectationFn =
    Arc<dyn Fn(&SimulationSummary) -> Result<()> + Send + Sync + 'static>;

#[derive(Clone)]
pub struct SimulationExpectation(SimulationExpectationFn);

impl fmt::Debug for SimulationExpectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimulationExpectation").finish()
    }
}

impl SimulationExpectation {
    #[must_use]
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&SimulationSummary) -> Result<()> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// # Errors
    /// Returns the expectation's failure.
    pub fn evaluate(&self, summary: &SimulationSummary) -> Result<()> {
        (self.0)(summary)
    }
}

impl<F> From<F> for SimulationExpectation
where
    F: Fn(&SimulationSummary) -> Result<()> + Send + Sync + 'static,
{
    fn from(f: F) -> Self {
        Self::new(f)
    }
}

#[derive(Debug, Clone)]
pub struct SimulationPlan {
    pub strategy: CaptureStrategy,
    pub turns: usize,
    pub rolls: RollPlan,
    pub store: StorePlan,
    /// Overrides the configured catalog size for fixture runs.
    pub catalog_size: Option<u32>,
    pub starting_stock: Option<StartingStock>,
    pub settle_ms: u64,
    /// Leave every n-th accepted action uncompleted so the watchdog must clear it.
    pub stall_every: Option<usize>,
    /// Fire extra actions while a resolution is in flight.
    pub probe_reentry: bool,
    pub setup: Option<fn(&mut SimSession)>,
    pub finale: Option<fn(&mut SimSession) -> Result<()>>,
    pub expectations: Vec<SimulationExpectation>,
}

impl SimulationPlan {
    #[must_use]
    pub const fn new(strategy: CaptureStrategy) -> Self {
        Self {
            strategy,
            turns: DEFAULT_TURNS,
            rolls: RollPlan::Seeded,
            store: StorePlan::Unbounded,
            catalog_size: None,
            starting_stock: None,
            settle_ms: DEFAULT_SETTLE_MS,
            stall_every: None,
            probe_reentry: false,
            setup: None,
            finale: None,
            expectations: Vec::new(),
        }
    }

    #[must_use]
    pub const fn with_turns(mut self, turns: usize) -> Self {
        self.turns = turns;
        self
    }

    #[must_use]
    pub const fn with_rolls(mut self, rolls: RollPlan) -> Self {
        self.rolls = rolls;
        self
    }

    #[must_use]
    pub const fn with_store(mut self, store: StorePlan) -> Self {
        self.store = store;
        self
    }

    #[must_use]
    pub const fn with_catalog_size(mut self, size: u32) -> Self {
        self.catalog_size = Some(size);
        self
    }

    #[must_use]
    pub const fn with_starting_stock(mut self, stock: StartingStock) -> Self {
        self.starting_stock = Some(stock);
        self
    }

    #[must_use]
    pub const fn with_stall_every(mut self, every: usize) -> Self {
        self.stall_every = Some(every);
        self
    }

    #[must_use]
    pub const fn with_reentry_probes(mut self) -> Self {
        self.probe_reentry = true;
        self
    }

    #[must_use]
    pub fn with_setup(mut self, setup: fn(&mut SimSession)) -> Self {
        self.setup = Some(setup);
        self
    }

    #[must_use]
    pub fn with_finale(mut self, finale: fn(&mut SimSession) -> Result<()>) -> Self {
        self.finale = Some(finale);
        self
    }

    #[must_use]
    pub fn with_expectation(mut self, expectation: impl Into<SimulationExpectation>) -> Self {
        self.expectations.push(expectation.into());
        self
    }

    /// `base` with this plan's overrides applied.
    #[must_use]
    pub fn config(&self, base: &CatchConfig) -> CatchConfig {
        let mut config = base.clone();
        if let Some(size) = self.catalog_size {
            config.catalog_size = size;
        }
        if let Some(stock) = self.starting_stock {
            config.starting_stock = stock;
        }
        config
    }

    fn stalls_on(&self, accepted: usize) -> bool {
        self.stall_every
            .is_some_and(|every| every > 0 && accepted % every == 0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnResult {
    Captured,
    Recaptured,
    Escaped,
    Fled,
    OutOfStock,
    NoEncounter,
    Ignored,
    Stalled,
}

#[derive(Debug, Clone, Serialize)]
pub struct TurnRecord {
    pub turn: usize,
    pub encounter_id: Option<u32>,
    pub action: Option<String>,
    pub rationale: Option<&'static str>,
    pub result: TurnResult,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SimulationMetrics {
    pub encounters: usize,
    pub legendary_encounters: usize,
    pub shiny_encounters: usize,
    pub captures: usize,
    pub first_captures: usize,
    pub escapes: usize,
    pub flees: usize,
    pub out_of_stock: usize,
    pub no_encounter: usize,
    pub ignored: usize,
    pub stalls: usize,
    pub watchdog_resets: usize,
    pub reentry_probes: usize,
    pub reentry_accepted: usize,
    pub degraded_saves: usize,
    pub failed_saves: usize,
    pub great_bonuses: u32,
    pub ultra_bonuses: u32,
    pub notices: BTreeMap<&'static str, usize>,
}

impl SimulationMetrics {
    fn tally(&mut self, notice: &Notice) {
        *self.notices.entry(notice.key()).or_default() += 1;
        match notice {
            Notice::SaveDegraded { .. } => self.degraded_saves += 1,
            Notice::SaveFailed { .. } => self.failed_saves += 1,
            Notice::WatchdogReset => self.watchdog_resets += 1,
            Notice::BonusGranted { ball, amount, .. } => match ball {
                BallKind::Great => self.great_bonuses += amount,
                BallKind::Ultra => self.ultra_bonuses += amount,
                BallKind::Poke => {}
            },
            _ => {}
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SimulationSummary {
    pub seed: u64,
    pub strategy: CaptureStrategy,
    pub turns: Vec<TurnRecord>,
    pub metrics: SimulationMetrics,
    pub final_inventory: Vec<(BallKind, Stock)>,
    pub total_captures: u32,
    pub final_stats: CollectionStats,
    /// Broken invariants observed during the run.
    pub violations: Vec<String>,
}

impl SimulationSummary {
    #[must_use]
    pub fn stock(&self, ball: BallKind) -> Option<Stock> {
        self.final_inventory
            .iter()
            .find(|(kind, _)| *kind == ball)
            .map(|(_, stock)| *stock)
    }

    /// Short action trail for failure messages.
    #[must_use]
    pub fn trail(&self, limit: usize) -> String {
        let tail = self.turns.len().saturating_sub(limit);
        self.turns[tail..]
            .iter()
            .map(|t| {
                format!(
                    "{}:{}={:?}",
                    t.turn,
                    t.action.as_deref().unwrap_or("-"),
                    t.result
                )
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Drives a [`SimSession`] with a policy against any catalog source.
pub struct Simulator {
    verbose: bool,
}

impl Simulator {
    #[must_use]
    pub const fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    /// Run `plan` once.
    ///
    /// # Errors
    /// Returns an error if the plan's finale hook fails.
    #[allow(clippy::future_not_send, clippy::too_many_lines)]
    pub async fn run_plan<Src>(
        &self,
        plan: &SimulationPlan,
        seed: u64,
        base_config: &CatchConfig,
        source: &Src,
    ) -> Result<SimulationSummary>
    where
        Src: CatalogSource + ?Sized,
    {
        let config = plan.config(base_config);
        let watchdog_ms = config.watchdog_ms;
        let clock = ManualClock::starting_at(SIM_EPOCH_MS);
        let mut session: SimSession = GameSession::new(
            config,
            plan.store.build(),
            SimRolls::new(plan.rolls, seed),
            clock.clone(),
        );
        if let Some(setup) = plan.setup {
            setup(&mut session);
        }

        let mut policy = plan.strategy.create_policy(seed);
        let mut metrics = SimulationMetrics::default();
        let mut turns = Vec::with_capacity(plan.turns);
        let mut violations = Vec::new();
        let mut chained: Option<EncounterRoll> = None;
        let mut accepted = 0usize;

        for turn in 1..=plan.turns {
            if session.encounter().is_none() {
                let roll = chained.take().or_else(|| session.request_encounter());
                if let Some(roll) = roll {
                    let lookup = lookup_roll(source, &roll).await;
                    if let Some(encounter) = session.fulfill_encounter(&roll, &lookup) {
                        metrics.encounters += 1;
                        metrics.legendary_encounters += usize::from(encounter.is_legendary);
                        metrics.shiny_encounters += usize::from(encounter.shiny);
                    }
                }
            }

            let Some(encounter) = session.encounter().cloned() else {
                let outcome = session.begin_capture(BallKind::Poke);
                if !matches!(
                    outcome,
                    ActionOutcome::Rejected {
                        rejection: Rejection::NoEncounter
                    }
                ) {
                    violations.push(format!("turn {turn}: action accepted without an encounter"));
                }
                metrics.no_encounter += 1;
                turns.push(TurnRecord {
                    turn,
                    encounter_id: None,
                    action: None,
                    rationale: None,
                    result: TurnResult::NoEncounter,
                });
                drain(&mut session, &mut metrics);
                clock.advance(plan.settle_ms);
                continue;
            };

            let inventory_before = session.inventory().clone();
            let captured_at_before = session
                .collection()
                .get(encounter.id)
                .and_then(|record| record.captured_at);
            let decision = policy.decide(&PolicyView {
                encounter: &encounter,
                inventory: &inventory_before,
                already_caught: session.collection().is_caught(encounter.id),
            });

            let outcome = match decision.action {
                PolicyAction::Throw(ball) => session.begin_capture(ball),
                PolicyAction::Flee => session.begin_flee(),
            };

            let result = match outcome {
                ActionOutcome::Ignored => {
                    violations.push(format!("turn {turn}: idle resolver ignored an action"));
                    metrics.ignored += 1;
                    TurnResult::Ignored
                }
                ActionOutcome::Rejected {
                    rejection: Rejection::NoEncounter,
                } => {
                    metrics.no_encounter += 1;
                    TurnResult::NoEncounter
                }
                ActionOutcome::Rejected {
                    rejection: Rejection::OutOfStock(ball),
                } => {
                    if session.inventory() != &inventory_before {
                        violations.push(format!("turn {turn}: out-of-stock {ball} changed inventory"));
                    }
                    if session.encounter().map(|e| e.id) != Some(encounter.id) {
                        violations.push(format!("turn {turn}: out-of-stock dropped the encounter"));
                    }
                    metrics.out_of_stock += 1;
                    TurnResult::OutOfStock
                }
                ActionOutcome::Pending { resolution } => {
                    accepted += 1;
                    if plan.probe_reentry {
                        metrics.reentry_probes += 3;
                        let again = session.begin_capture(BallKind::Poke);
                        let flee = session.begin_flee();
                        for probe in [again, flee] {
                            if !matches!(probe, ActionOutcome::Ignored) {
                                metrics.reentry_accepted += 1;
                                violations.push(format!("turn {turn}: action accepted while resolving"));
                            }
                        }
                        if session.request_encounter().is_some() {
                            metrics.reentry_accepted += 1;
                            violations.push(format!("turn {turn}: encounter rolled while resolving"));
                        }
                    }

                    let result = match &resolution.result {
                        ResolutionResult::Captured {
                            probability,
                            first_capture,
                            captured_at,
                            ..
                        } => {
                            check_probability(turn, *probability, &mut violations);
                            metrics.captures += 1;
                            if *first_capture {
                                metrics.first_captures += 1;
                                TurnResult::Captured
                            } else {
                                if Some(*captured_at) != captured_at_before {
                                    violations.push(format!(
                                        "turn {turn}: recapture of #{} rewrote captured_at",
                                        encounter.id
                                    ));
                                }
                                TurnResult::Recaptured
                            }
                        }
                        ResolutionResult::Escaped { probability, .. } => {
                            check_probability(turn, *probability, &mut violations);
                            metrics.escapes += 1;
                            TurnResult::Escaped
                        }
                        ResolutionResult::Fled => {
                            metrics.flees += 1;
                            TurnResult::Fled
                        }
                    };

                    if plan.stalls_on(accepted) {
                        metrics.stalls += 1;
                        clock.advance(watchdog_ms.saturating_add(1));
                        if !session.poll_watchdog() {
                            violations.push(format!("turn {turn}: watchdog did not fire"));
                        }
                        if session.complete(resolution.ticket).is_some() {
                            violations.push(format!("turn {turn}: stale completion was honoured"));
                        }
                        TurnResult::Stalled
                    } else {
                        clock.advance(plan.settle_ms);
                        chained = session.complete(resolution.ticket);
                        result
                    }
                }
            };

            if self.verbose {
                log::debug!(
                    "turn {turn}: #{} {} ({}) -> {result:?}",
                    encounter.id,
                    decision.action,
                    decision.rationale.unwrap_or(policy.name())
                );
            }
            turns.push(TurnRecord {
                turn,
                encounter_id: Some(encounter.id),
                action: Some(decision.action.to_string()),
                rationale: decision.rationale,
                result,
            });

            drain(&mut session, &mut metrics);
            let caught = session.collection().records().filter(|r| r.caught).count();
            if usize::try_from(session.inventory().total_captures()).ok() != Some(caught) {
                violations.push(format!(
                    "turn {turn}: total captures {} disagree with {caught} caught records",
                    session.inventory().total_captures()
                ));
            }
            clock.advance(plan.settle_ms);
        }

        if let Some(roll) = chained.take() {
            session.abandon_encounter(&roll);
        }
        if let Some(finale) = plan.finale {
            finale(&mut session).context("finale hook failed")?;
        }
        drain(&mut session, &mut metrics);

        Ok(SimulationSummary {
            seed,
            strategy: plan.strategy,
            turns,
            metrics,
            final_inventory: session.inventory().snapshot(),
            total_captures: session.inventory().total_captures(),
            final_stats: session.stats(),
            violations,
        })
    }
}

fn drain(session: &mut SimSession, metrics: &mut SimulationMetrics) {
    for notice in session.drain_notices() {
        metrics.tally(&notice);
    }
}

fn check_probability(turn: usize, probability: f64, violations: &mut Vec<String>) {
    if !(0.0..=1.0).contains(&probability) {
        violations.push(format!("turn {turn}: probability {probability} out of range"));
    }
}
