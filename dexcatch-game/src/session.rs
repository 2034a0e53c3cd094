//! The owned game context: config, stores, encounter generator, resolver, and
//! the injected roll source and clock. Hosts drive it through commands and
//! drain [`Notice`]s after each one.
use serde::Serialize;

use crate::ball::BallKind;
use crate::catalog::CatalogSource;
use crate::clock::Clock;
use crate::collection::{Collection, CollectionStats};
use crate::config::CatchConfig;
use crate::encounter::{CatalogLookup, Encounter, EncounterGenerator, EncounterRoll, lookup_roll};
use crate::export::{ExportFormat, ImportError, export_collection, parse_import};
use crate::inventory::Inventory;
use crate::notice::Notice;
use crate::query::{CollectionQuery, QueryPage};
use crate::resolver::{
    ActionOutcome, CaptureResolver, Rejection, ResolutionResult, ResolutionTicket, ResolverState,
    Stores,
};
use crate::rolls::RollSource;
use crate::storage::{KeyValueStore, SaveOutcome, SaveReport};

/// A one-shot action: the resolver outcome plus the chained encounter request,
/// if one was issued.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnOutcome {
    pub outcome: ActionOutcome,
    pub next_encounter: Option<EncounterRoll>,
}

/// Counts reported after a reset or import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StoreSummary {
    pub records: usize,
    pub total_captures: u32,
}

pub struct GameSession<S, D, C> {
    config: CatchConfig,
    generator: EncounterGenerator,
    resolver: CaptureResolver,
    stores: Stores<S>,
    rolls: D,
    clock: C,
    notices: Vec<Notice>,
}

impl<S, D, C> GameSession<S, D, C>
where
    S: KeyValueStore,
    D: RollSource,
    C: Clock,
{
    /// Build a session, restoring both stores from `store`.
    pub fn new(config: CatchConfig, store: S, rolls: D, clock: C) -> Self {
        let stores = Stores::load(store, &config);
        log::debug!(
            "session loaded: {} records, {} captures",
            stores.collection.len(),
            stores.inventory.total_captures()
        );
        Self {
            generator: EncounterGenerator::new(&config),
            resolver: CaptureResolver::new(config.clone()),
            config,
            stores,
            rolls,
            clock,
            notices: Vec::new(),
        }
    }

    pub const fn config(&self) -> &CatchConfig {
        &self.config
    }

    pub const fn inventory(&self) -> &Inventory {
        &self.stores.inventory
    }

    pub const fn collection(&self) -> &Collection {
        &self.stores.collection
    }

    pub const fn encounter(&self) -> Option<&Encounter> {
        self.resolver.encounter()
    }

    pub const fn resolver_state(&self) -> ResolverState {
        self.resolver.state()
    }

    pub const fn is_encounter_pending(&self) -> bool {
        self.generator.is_pending()
    }

    pub const fn store(&self) -> &S {
        self.stores.persister().store()
    }

    pub const fn store_mut(&mut self) -> &mut S {
        self.stores.persister_mut().store_mut()
    }

    pub const fn rolls_mut(&mut self) -> &mut D {
        &mut self.rolls
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    pub fn drain_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    // Encounters ------------------------------------------------------------

    /// Roll a new encounter. `None` while a resolution or another request is
    /// in flight.
    pub fn request_encounter(&mut self) -> Option<EncounterRoll> {
        self.poll_watchdog();
        if !self.resolver.is_idle() {
            log::debug!("encounter request suppressed: resolver busy");
            return None;
        }
        self.generator.request(&mut self.rolls)
    }

    /// Realise `roll` and make it the active encounter. Stale rolls are ignored.
    pub fn fulfill_encounter(
        &mut self,
        roll: &EncounterRoll,
        lookup: &CatalogLookup,
    ) -> Option<&Encounter> {
        let encounter = self.generator.fulfill(roll, lookup)?;
        if self.stores.collection.get(encounter.id).is_none() {
            self.stores.collection.observe(&encounter);
            let report = self.stores.save_collection();
            self.note_save(&report);
        }
        self.notices.push(Notice::EncounterAppeared {
            id: encounter.id,
            name: encounter.name.clone(),
            shiny: encounter.shiny,
        });
        self.resolver.present(encounter);
        self.resolver.encounter()
    }

    pub fn abandon_encounter(&mut self, roll: &EncounterRoll) {
        self.generator.abandon(roll);
    }

    /// Request, look up, and fulfill in one step.
    pub async fn spawn_encounter<Src>(&mut self, source: &Src) -> Option<Encounter>
    where
        Src: CatalogSource + ?Sized,
    {
        let roll = self.request_encounter()?;
        let lookup = lookup_roll(source, &roll).await;
        self.fulfill_encounter(&roll, &lookup).cloned()
    }

    // Resolution ------------------------------------------------------------

    /// Accept a capture attempt. The resolver stays busy until
    /// [`GameSession::complete`] is called with the returned ticket.
    pub fn begin_capture(&mut self, ball: BallKind) -> ActionOutcome {
        self.poll_watchdog();
        let now = self.clock.now_ms();
        let outcome =
            self.resolver
                .attempt_capture(ball, &mut self.stores, &mut self.rolls, now);
        self.note_outcome(&outcome);
        outcome
    }

    /// Accept a flee.
    pub fn begin_flee(&mut self) -> ActionOutcome {
        self.poll_watchdog();
        let now = self.clock.now_ms();
        let outcome = self.resolver.flee(now);
        self.note_outcome(&outcome);
        outcome
    }

    /// Finish a pending resolution and chain the next encounter request.
    pub fn complete(&mut self, ticket: ResolutionTicket) -> Option<EncounterRoll> {
        if !self.resolver.complete(ticket) {
            log::debug!("completion for {ticket:?} ignored");
            return None;
        }
        self.request_encounter()
    }

    /// Capture and complete in one step.
    pub fn attempt_capture(&mut self, ball: BallKind) -> TurnOutcome {
        let outcome = self.begin_capture(ball);
        self.finish(outcome)
    }

    /// Flee and complete in one step.
    pub fn flee(&mut self) -> TurnOutcome {
        let outcome = self.begin_flee();
        self.finish(outcome)
    }

    fn finish(&mut self, outcome: ActionOutcome) -> TurnOutcome {
        let next_encounter = match &outcome {
            ActionOutcome::Pending { resolution } => self.complete(resolution.ticket),
            ActionOutcome::Ignored | ActionOutcome::Rejected { .. } => None,
        };
        TurnOutcome {
            outcome,
            next_encounter,
        }
    }

    /// Force the resolver idle if its deadline has passed.
    pub fn poll_watchdog(&mut self) -> bool {
        let fired = self.resolver.poll_watchdog(self.clock.now_ms());
        if fired {
            self.notices.push(Notice::WatchdogReset);
        }
        fired
    }

    // Collection management -------------------------------------------------

    /// Serialize the collection.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn export_collection(&self, format: ExportFormat) -> Result<String, serde_json::Error> {
        export_collection(&self.stores.collection, format, self.clock.now_ms())
    }

    /// Replace the collection with validated imported data.
    ///
    /// # Errors
    ///
    /// Returns an [`ImportError`] and leaves the collection untouched when the
    /// data is rejected.
    pub fn import_collection(&mut self, text: &str) -> Result<StoreSummary, ImportError> {
        let imported = match parse_import(text, self.config.catalog_size) {
            Ok(imported) => imported,
            Err(err) => {
                log::warn!("import rejected: {err}");
                self.notices.push(Notice::ImportRejected {
                    reason: err.to_string(),
                });
                return Err(err);
            }
        };
        self.stores.collection = imported;
        let report = self.stores.save_collection();
        self.note_save(&report);
        let records = self.stores.collection.len();
        log::info!("imported {records} records");
        self.notices.push(Notice::ImportOk { records });
        Ok(self.summary())
    }

    /// Clear the collection and restore the starting inventory.
    pub fn reset_collection(&mut self) -> StoreSummary {
        self.resolver.reset();
        self.stores.collection.clear();
        self.stores.inventory = Inventory::starting(&self.config.starting_stock);
        let reports = [self.stores.save_collection(), self.stores.save_inventory()];
        for report in &reports {
            self.note_save(report);
        }
        log::info!("collection reset");
        self.notices.push(Notice::CollectionReset);
        self.summary()
    }

    #[must_use]
    pub fn stats(&self) -> CollectionStats {
        self.stores.collection.stats(self.config.catalog_size)
    }

    #[must_use]
    pub fn query(&self, query: &CollectionQuery) -> QueryPage {
        query.run(&self.stores.collection)
    }

    fn summary(&self) -> StoreSummary {
        StoreSummary {
            records: self.stores.collection.len(),
            total_captures: self.stores.inventory.total_captures(),
        }
    }

    // Notices ---------------------------------------------------------------

    fn note_save(&mut self, report: &SaveReport) {
        match report.outcome {
            SaveOutcome::Full => {}
            SaveOutcome::Failed => self.notices.push(Notice::SaveFailed {
                key: report.key.clone(),
            }),
            outcome => self.notices.push(Notice::SaveDegraded {
                key: report.key.clone(),
                outcome,
            }),
        }
    }

    fn note_outcome(&mut self, outcome: &ActionOutcome) {
        match outcome {
            ActionOutcome::Ignored => {}
            ActionOutcome::Rejected { rejection } => self.notices.push(match rejection {
                Rejection::NoEncounter => Notice::NoEncounter,
                Rejection::OutOfStock(ball) => Notice::OutOfStock { ball: *ball },
            }),
            ActionOutcome::Pending { resolution } => {
                for report in &resolution.saves {
                    self.note_save(report);
                }
                let id = resolution.encounter.id;
                let name = resolution.encounter.name.clone();
                match &resolution.result {
                    ResolutionResult::Captured {
                        first_capture,
                        bonuses,
                        ..
                    } => {
                        self.notices.push(Notice::CaptureSuccess {
                            id,
                            name,
                            first_capture: *first_capture,
                        });
                        self.notices
                            .extend(bonuses.iter().map(|grant| Notice::BonusGranted {
                                ball: grant.ball,
                                amount: grant.amount,
                                milestone: grant.milestone,
                            }));
                    }
                    ResolutionResult::Escaped { .. } => {
                        self.notices.push(Notice::CaptureEscaped { id, name });
                    }
                    ResolutionResult::Fled => self.notices.push(Notice::Fled { id, name }),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::FixtureCatalog;
    use crate::clock::ManualClock;
    use crate::inventory::Stock;
    use crate::rolls::ScriptedRolls;
    use crate::storage::MemoryStore;
    use futures::executor::block_on;

    type TestSession = GameSession<MemoryStore, ScriptedRolls, ManualClock>;

    fn session(rolls: ScriptedRolls) -> (TestSession, ManualClock) {
        let clock = ManualClock::starting_at(1_000);
        let session = GameSession::new(
            CatchConfig::default_config(),
            MemoryStore::new(),
            rolls,
            clock.clone(),
        );
        (session, clock)
    }

    fn spawn(session: &mut TestSession, catalog: &FixtureCatalog) -> Encounter {
        block_on(session.spawn_encounter(catalog)).expect("encounter")
    }

    #[test]
    fn great_ball_scenario_succeeds_with_zero_roll() {
        let catalog = FixtureCatalog::generated(1025);
        let (mut session, _) = session(ScriptedRolls::fixed(0.0).with_picks([25, 1]));
        let encounter = spawn(&mut session, &catalog);
        assert!(!encounter.shiny && !encounter.is_legendary);

        let turn = session.attempt_capture(BallKind::Great);
        assert!(matches!(turn.outcome, ActionOutcome::Pending { .. }));
        assert_eq!(session.inventory().stock(BallKind::Great), Stock::Count(1));
        assert!(session.collection().is_caught(25));
        assert_eq!(session.inventory().total_captures(), 1);
        assert!(turn.next_encounter.is_some(), "next encounter is chained");
    }

    #[test]
    fn failed_roll_clears_encounter_and_chains() {
        let catalog = FixtureCatalog::generated(1025);
        let (mut session, _) = session(ScriptedRolls::fixed(0.99).with_picks([33, 1]));
        spawn(&mut session, &catalog);
        let collection_before = session.collection().clone();
        let inventory_before = session.inventory().clone();

        let turn = session.attempt_capture(BallKind::Poke);
        assert!(matches!(
            turn.outcome,
            ActionOutcome::Pending { ref resolution }
                if matches!(resolution.result, ResolutionResult::Escaped { .. })
        ));
        assert_eq!(session.collection(), &collection_before);
        assert_eq!(session.inventory(), &inventory_before);
        assert!(session.encounter().is_none());
        assert!(turn.next_encounter.is_some());
        assert!(session.is_encounter_pending());
    }

    #[test]
    fn out_of_stock_surfaces_notice() {
        let catalog = FixtureCatalog::generated(100);
        let (mut session, _) = session(ScriptedRolls::fixed(0.0));
        spawn(&mut session, &catalog);
        session.drain_notices();
        for _ in 0..2 {
            let turn = session.attempt_capture(BallKind::Ultra);
            if matches!(turn.outcome, ActionOutcome::Rejected { .. }) {
                break;
            }
            let roll = turn.next_encounter.expect("chained");
            let lookup = block_on(lookup_roll(&catalog, &roll));
            session.fulfill_encounter(&roll, &lookup);
        }
        assert_eq!(session.inventory().stock(BallKind::Ultra), Stock::Count(0));
        assert!(
            session
                .notices()
                .contains(&Notice::OutOfStock { ball: BallKind::Ultra })
        );
        assert!(session.encounter().is_some());
    }

    #[test]
    fn actions_while_resolving_are_ignored() {
        let catalog = FixtureCatalog::generated(100);
        let (mut session, _) = session(ScriptedRolls::fixed(0.0));
        spawn(&mut session, &catalog);
        let ActionOutcome::Pending { resolution } = session.begin_capture(BallKind::Great) else {
            panic!("capture should be accepted");
        };
        let inventory = session.inventory().clone();
        assert_eq!(session.begin_capture(BallKind::Great), ActionOutcome::Ignored);
        assert_eq!(session.begin_flee(), ActionOutcome::Ignored);
        assert!(session.request_encounter().is_none());
        assert_eq!(session.inventory(), &inventory);
        assert!(session.complete(resolution.ticket).is_some());
        assert!(session.complete(resolution.ticket).is_none());
    }

    #[test]
    fn watchdog_recovers_a_stuck_resolution() {
        let catalog = FixtureCatalog::generated(100);
        let (mut session, clock) = session(ScriptedRolls::fixed(0.5));
        spawn(&mut session, &catalog);
        let outcome = session.begin_flee();
        assert!(matches!(outcome, ActionOutcome::Pending { .. }));
        clock.advance(5_999);
        assert!(!session.poll_watchdog());
        clock.advance(1);
        assert!(session.request_encounter().is_some());
        assert!(session.notices().contains(&Notice::WatchdogReset));
        assert_eq!(session.resolver_state(), ResolverState::Idle);
    }

    #[test]
    fn flee_without_encounter_reports_notice() {
        let (mut session, _) = session(ScriptedRolls::fixed(0.5));
        let turn = session.flee();
        assert_eq!(
            turn.outcome,
            ActionOutcome::Rejected {
                rejection: Rejection::NoEncounter
            }
        );
        assert_eq!(session.drain_notices(), vec![Notice::NoEncounter]);
        assert!(session.notices().is_empty());
    }

    #[test]
    fn malformed_import_leaves_collection_untouched() {
        let catalog = FixtureCatalog::generated(100);
        let (mut session, _) = session(ScriptedRolls::fixed(0.0));
        spawn(&mut session, &catalog);
        session.attempt_capture(BallKind::Poke);
        let before = session.collection().clone();
        session.drain_notices();

        let err = session.import_collection("{ not json").unwrap_err();
        assert!(matches!(err, ImportError::Malformed(_)));
        assert_eq!(session.collection(), &before);
        assert!(matches!(
            session.notices(),
            [Notice::ImportRejected { .. }]
        ));
    }

    #[test]
    fn export_import_and_reset_cycle() {
        let catalog = FixtureCatalog::generated(100);
        let (mut session, _) = session(ScriptedRolls::fixed(0.0).with_picks([10, 1]));
        spawn(&mut session, &catalog);
        session.attempt_capture(BallKind::Poke);
        let exported = session.export_collection(ExportFormat::Json).unwrap();

        let summary = session.reset_collection();
        assert_eq!(summary.records, 0);
        assert_eq!(summary.total_captures, 0);
        assert_eq!(session.inventory(), &Inventory::starting(&session.config().starting_stock));
        assert!(session.encounter().is_none());

        let summary = session.import_collection(&exported).unwrap();
        assert_eq!(summary.records, 1);
        assert!(session.collection().is_caught(10));
        let reloaded: Collection = serde_json::from_str(
            session
                .store()
                .raw(&session.config().collection_key())
                .unwrap(),
        )
        .unwrap();
        assert!(reloaded.is_caught(10));
    }

    #[test]
    fn observed_records_are_persisted_and_counted() {
        let catalog = FixtureCatalog::generated(100);
        let (mut session, _) = session(ScriptedRolls::fixed(0.99).with_picks([4, 1]));
        spawn(&mut session, &catalog);
        let stats = session.stats();
        assert_eq!(stats.seen, 1);
        assert_eq!(stats.caught, 0);
        assert!(session.store().raw("dexcatch.collection").is_some());
    }

    #[test]
    fn failed_saves_surface_notices_but_keep_state() {
        let catalog = FixtureCatalog::generated(100);
        let (mut session, _) = session(ScriptedRolls::fixed(0.0).with_picks([5, 1]));
        spawn(&mut session, &catalog);
        session.store_mut().set_fail_writes(true);
        session.drain_notices();
        let turn = session.attempt_capture(BallKind::Great);
        assert!(matches!(turn.outcome, ActionOutcome::Pending { .. }));
        assert!(session.collection().is_caught(5));
        assert!(session.resolver_state() == ResolverState::Idle);
        assert!(
            session
                .notices()
                .iter()
                .any(|n| matches!(n, Notice::SaveFailed { .. }))
        );
    }
}
