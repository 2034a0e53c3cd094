//! Capture resolver: the `Idle` / `Resolving` state machine that owns the
//! active encounter and applies capture and flee outcomes to the stores.
use serde::Serialize;

use crate::ball::BallKind;
use crate::collection::Collection;
use crate::config::CatchConfig;
use crate::constants::GUARANTEED_CATCH_PROBABILITY;
use crate::encounter::Encounter;
use crate::inventory::{BonusGrant, Inventory};
use crate::numbers::clamp_probability;
use crate::rolls::RollSource;
use crate::storage::{KeyValueStore, Persister, SaveReport};

/// Identifies one accepted action between acceptance and completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ResolutionTicket(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolverState {
    Idle,
    /// An action was accepted. `deadline_ms` is the watchdog expiry.
    Resolving {
        ticket: ResolutionTicket,
        deadline_ms: u64,
    },
}

/// The two persisted stores plus their keys.
#[derive(Debug, Clone)]
pub struct Stores<S> {
    pub inventory: Inventory,
    pub collection: Collection,
    persister: Persister<S>,
    inventory_key: String,
    collection_key: String,
}

impl<S: KeyValueStore> Stores<S> {
    /// Restore both stores from `store`; malformed data resets to defaults.
    pub fn load(store: S, config: &CatchConfig) -> Self {
        let persister = Persister::new(store);
        let inventory_key = config.inventory_key();
        let collection_key = config.collection_key();
        let inventory =
            persister.load_or_else(&inventory_key, || Inventory::starting(&config.starting_stock));
        let collection = persister.load(&collection_key);
        Self {
            inventory,
            collection,
            persister,
            inventory_key,
            collection_key,
        }
    }

    pub fn save_inventory(&mut self) -> SaveReport {
        self.persister.save(&self.inventory_key, &self.inventory)
    }

    pub fn save_collection(&mut self) -> SaveReport {
        self.persister.save(&self.collection_key, &self.collection)
    }

    pub const fn persister(&self) -> &Persister<S> {
        &self.persister
    }

    pub const fn persister_mut(&mut self) -> &mut Persister<S> {
        &mut self.persister
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResolutionResult {
    Captured {
        ball: BallKind,
        probability: f64,
        roll: f64,
        first_capture: bool,
        captured_at: u64,
        bonuses: Vec<BonusGrant>,
    },
    Escaped {
        ball: BallKind,
        probability: f64,
        roll: f64,
    },
    Fled,
}

/// An accepted action. The resolver stays `Resolving` until
/// [`CaptureResolver::complete`] is called with `ticket` or the watchdog fires.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resolution {
    pub ticket: ResolutionTicket,
    pub encounter: Encounter,
    pub result: ResolutionResult,
    pub saves: Vec<SaveReport>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", content = "ball", rename_all = "snake_case")]
pub enum Rejection {
    NoEncounter,
    OutOfStock(BallKind),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ActionOutcome {
    /// A resolution was already in flight; nothing happened.
    Ignored,
    Rejected { rejection: Rejection },
    Pending { resolution: Resolution },
}

/// Success probability for throwing `ball` at `encounter`.
#[must_use]
pub fn capture_probability(
    config: &CatchConfig,
    ball: BallKind,
    encounter: &Encounter,
    already_caught: bool,
) -> f64 {
    if encounter.shiny && encounter.is_legendary {
        return GUARANTEED_CATCH_PROBABILITY;
    }
    let mut p = config.base_rate * config.multipliers.for_ball(ball);
    if already_caught {
        p -= config.repeat_penalty;
    }
    clamp_probability(p, config.max_probability)
}

#[derive(Debug, Clone)]
pub struct CaptureResolver {
    config: CatchConfig,
    state: ResolverState,
    encounter: Option<Encounter>,
    next_ticket: u64,
}

impl CaptureResolver {
    #[must_use]
    pub fn new(config: CatchConfig) -> Self {
        Self {
            config,
            state: ResolverState::Idle,
            encounter: None,
            next_ticket: 1,
        }
    }

    #[must_use]
    pub const fn state(&self) -> ResolverState {
        self.state
    }

    #[must_use]
    pub const fn is_idle(&self) -> bool {
        matches!(self.state, ResolverState::Idle)
    }

    #[must_use]
    pub const fn encounter(&self) -> Option<&Encounter> {
        self.encounter.as_ref()
    }

    /// Make `encounter` the active one.
    pub fn present(&mut self, encounter: Encounter) {
        if let Some(previous) = &self.encounter {
            log::debug!("replacing active encounter #{}", previous.id);
        }
        self.encounter = Some(encounter);
    }

    fn begin(&mut self, now_ms: u64) -> ResolutionTicket {
        let ticket = ResolutionTicket(self.next_ticket);
        self.next_ticket = self.next_ticket.wrapping_add(1);
        self.state = ResolverState::Resolving {
            ticket,
            deadline_ms: now_ms.saturating_add(self.config.watchdog_ms),
        };
        ticket
    }

    fn guard(&self) -> Result<(), ActionOutcome> {
        if !self.is_idle() {
            log::debug!("action ignored: resolution already in flight");
            return Err(ActionOutcome::Ignored);
        }
        if self.encounter.is_none() {
            return Err(ActionOutcome::Rejected {
                rejection: Rejection::NoEncounter,
            });
        }
        Ok(())
    }

    /// Throw `ball` at the active encounter.
    pub fn attempt_capture<S, D>(
        &mut self,
        ball: BallKind,
        stores: &mut Stores<S>,
        rolls: &mut D,
        now_ms: u64,
    ) -> ActionOutcome
    where
        S: KeyValueStore,
        D: RollSource + ?Sized,
    {
        if let Err(outcome) = self.guard() {
            return outcome;
        }
        let ticket = self.begin(now_ms);
        let Some(encounter) = self.encounter.clone() else {
            self.state = ResolverState::Idle;
            return ActionOutcome::Rejected {
                rejection: Rejection::NoEncounter,
            };
        };

        let already_caught = stores.collection.is_caught(encounter.id);
        let probability = capture_probability(&self.config, ball, &encounter, already_caught);

        let mut saves = Vec::new();
        if !ball.is_default() {
            if stores.inventory.try_consume(ball).is_err() {
                self.state = ResolverState::Idle;
                return ActionOutcome::Rejected {
                    rejection: Rejection::OutOfStock(ball),
                };
            }
            saves.push(stores.save_inventory());
        }

        let roll = rolls.unit();
        log::debug!(
            "capture #{} with {ball}: p={probability:.3} roll={roll:.3}",
            encounter.id
        );

        let result = if roll < probability {
            let mark = stores.collection.mark_caught(&encounter, now_ms);
            saves.push(stores.save_collection());
            let bonuses = if mark.first_capture {
                let bonuses = stores.inventory.record_first_capture(&self.config);
                saves.push(stores.save_inventory());
                bonuses
            } else {
                Vec::new()
            };
            ResolutionResult::Captured {
                ball,
                probability,
                roll,
                first_capture: mark.first_capture,
                captured_at: mark.captured_at,
                bonuses,
            }
        } else {
            ResolutionResult::Escaped {
                ball,
                probability,
                roll,
            }
        };

        self.encounter = None;
        ActionOutcome::Pending {
            resolution: Resolution {
                ticket,
                encounter,
                result,
                saves,
            },
        }
    }

    /// Let the active encounter go. No store is touched.
    pub fn flee(&mut self, now_ms: u64) -> ActionOutcome {
        if let Err(outcome) = self.guard() {
            return outcome;
        }
        let ticket = self.begin(now_ms);
        let Some(encounter) = self.encounter.take() else {
            self.state = ResolverState::Idle;
            return ActionOutcome::Rejected {
                rejection: Rejection::NoEncounter,
            };
        };
        ActionOutcome::Pending {
            resolution: Resolution {
                ticket,
                encounter,
                result: ResolutionResult::Fled,
                saves: Vec::new(),
            },
        }
    }

    /// Finish the resolution identified by `ticket`. Returns `false` if it was
    /// already finished or reset by the watchdog.
    pub fn complete(&mut self, ticket: ResolutionTicket) -> bool {
        match self.state {
            ResolverState::Resolving { ticket: current, .. } if current == ticket => {
                self.state = ResolverState::Idle;
                true
            }
            _ => false,
        }
    }

    /// Force `Idle` if the in-flight resolution outlived its deadline.
    /// Returns `true` when the watchdog fired.
    pub fn poll_watchdog(&mut self, now_ms: u64) -> bool {
        match self.state {
            ResolverState::Resolving { deadline_ms, .. } if now_ms >= deadline_ms => {
                log::warn!("resolution watchdog expired; forcing idle");
                self.state = ResolverState::Idle;
                self.encounter = None;
                true
            }
            _ => false,
        }
    }

    /// Drop the active encounter and any in-flight resolution.
    pub fn reset(&mut self) {
        self.state = ResolverState::Idle;
        self.encounter = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::Stock;
    use crate::rolls::ScriptedRolls;
    use crate::storage::{MemoryStore, SaveOutcome};

    fn wild(id: u32) -> Encounter {
        Encounter {
            id,
            name: format!("wild-{id}"),
            sprite: None,
            types: vec!["bug".into()],
            shiny: false,
            is_legendary: false,
        }
    }

    fn setup() -> (CaptureResolver, Stores<MemoryStore>) {
        let config = CatchConfig::default_config();
        let stores = Stores::load(MemoryStore::new(), &config);
        (CaptureResolver::new(config), stores)
    }

    fn pending(outcome: ActionOutcome) -> Resolution {
        match outcome {
            ActionOutcome::Pending { resolution } => resolution,
            other => panic!("expected pending resolution, got {other:?}"),
        }
    }

    #[test]
    fn probability_scales_penalises_and_clamps() {
        let config = CatchConfig::default_config();
        let e = wild(1);
        let poke = capture_probability(&config, BallKind::Poke, &e, false);
        let great = capture_probability(&config, BallKind::Great, &e, false);
        let ultra = capture_probability(&config, BallKind::Ultra, &e, false);
        assert!((poke - 0.4).abs() < 1e-9);
        assert!((great - 0.6).abs() < 1e-9);
        assert!((ultra - 0.88).abs() < 1e-9);
        let repeat = capture_probability(&config, BallKind::Great, &e, true);
        assert!((repeat - 0.5).abs() < 1e-9);

        let generous = CatchConfig {
            base_rate: 0.9,
            ..CatchConfig::default_config()
        };
        let clamped = capture_probability(&generous, BallKind::Ultra, &e, false);
        assert!((clamped - 0.98).abs() < 1e-9);
    }

    #[test]
    fn shiny_legendary_is_guaranteed() {
        let config = CatchConfig::default_config();
        let mut e = wild(150);
        e.shiny = true;
        e.is_legendary = true;
        for ball in BallKind::ALL {
            for caught in [false, true] {
                let p = capture_probability(&config, ball, &e, caught);
                assert!((p - 1.0).abs() < f64::EPSILON);
            }
        }
        e.shiny = false;
        assert!(capture_probability(&config, BallKind::Poke, &e, false) < 1.0);
    }

    #[test]
    fn forced_success_ignores_the_draw() {
        let (mut resolver, mut stores) = setup();
        let mut e = wild(151);
        e.shiny = true;
        e.is_legendary = true;
        resolver.present(e);
        let mut rolls = ScriptedRolls::fixed(0.999_999);
        let resolution = pending(resolver.attempt_capture(BallKind::Poke, &mut stores, &mut rolls, 5));
        assert!(matches!(resolution.result, ResolutionResult::Captured { .. }));
        assert!(stores.collection.is_caught(151));
    }

    #[test]
    fn out_of_stock_aborts_without_mutation() {
        let (mut resolver, mut stores) = setup();
        stores.inventory.set_stock(BallKind::Ultra, Stock::Count(0));
        let before = stores.inventory.clone();
        resolver.present(wild(3));
        let mut rolls = ScriptedRolls::fixed(0.0);
        let outcome = resolver.attempt_capture(BallKind::Ultra, &mut stores, &mut rolls, 0);
        assert_eq!(
            outcome,
            ActionOutcome::Rejected {
                rejection: Rejection::OutOfStock(BallKind::Ultra)
            }
        );
        assert!(resolver.is_idle());
        assert_eq!(stores.inventory, before);
        assert!(stores.collection.is_empty());
        assert!(resolver.encounter().is_some(), "encounter stays catchable");
        assert!(stores.persister().store().raw("dexcatch.inventory").is_none());
    }

    #[test]
    fn busy_resolver_ignores_actions() {
        let (mut resolver, mut stores) = setup();
        resolver.present(wild(8));
        let mut rolls = ScriptedRolls::fixed(0.99);
        let first = pending(resolver.attempt_capture(BallKind::Great, &mut stores, &mut rolls, 0));
        assert_eq!(stores.inventory.stock(BallKind::Great), Stock::Count(1));

        resolver.present(wild(9));
        assert_eq!(
            resolver.attempt_capture(BallKind::Great, &mut stores, &mut rolls, 1),
            ActionOutcome::Ignored
        );
        assert_eq!(resolver.flee(1), ActionOutcome::Ignored);
        assert_eq!(stores.inventory.stock(BallKind::Great), Stock::Count(1));

        assert!(resolver.complete(first.ticket));
        assert!(!resolver.complete(first.ticket));
        assert!(resolver.is_idle());
    }

    #[test]
    fn failure_leaves_stores_untouched_and_clears_encounter() {
        let (mut resolver, mut stores) = setup();
        resolver.present(wild(10));
        let mut rolls = ScriptedRolls::fixed(0.99);
        let resolution = pending(resolver.attempt_capture(BallKind::Poke, &mut stores, &mut rolls, 0));
        assert!(matches!(resolution.result, ResolutionResult::Escaped { .. }));
        assert!(resolution.saves.is_empty(), "default ball is never persisted");
        assert!(stores.collection.is_empty());
        assert_eq!(stores.inventory.total_captures(), 0);
        assert!(resolver.encounter().is_none());
    }

    #[test]
    fn success_persists_both_stores() {
        let (mut resolver, mut stores) = setup();
        resolver.present(wild(11));
        let mut rolls = ScriptedRolls::fixed(0.0);
        let resolution = pending(resolver.attempt_capture(BallKind::Great, &mut stores, &mut rolls, 42));
        assert!(matches!(
            resolution.result,
            ResolutionResult::Captured {
                first_capture: true,
                captured_at: 42,
                ..
            }
        ));
        assert_eq!(resolution.saves.len(), 3);
        assert!(resolution.saves.iter().all(|s| s.outcome == SaveOutcome::Full));
        let reloaded = Stores::load(stores.persister().store().clone(), &CatchConfig::default_config());
        assert!(reloaded.collection.is_caught(11));
        assert_eq!(reloaded.inventory.total_captures(), 1);
        assert_eq!(reloaded.inventory.stock(BallKind::Great), Stock::Count(1));
    }

    #[test]
    fn recapture_does_not_count_again() {
        let (mut resolver, mut stores) = setup();
        let mut rolls = ScriptedRolls::fixed(0.0);
        for now in [1, 2] {
            resolver.present(wild(12));
            let r = pending(resolver.attempt_capture(BallKind::Poke, &mut stores, &mut rolls, now));
            resolver.complete(r.ticket);
        }
        assert_eq!(stores.inventory.total_captures(), 1);
        assert_eq!(stores.collection.get(12).unwrap().captured_at, Some(1));
    }

    #[test]
    fn watchdog_forces_idle_after_deadline() {
        let (mut resolver, _) = setup();
        resolver.present(wild(13));
        let resolution = pending(resolver.flee(1_000));
        assert!(!resolver.poll_watchdog(6_999));
        assert!(!resolver.is_idle());
        assert!(resolver.poll_watchdog(7_000));
        assert!(resolver.is_idle());
        assert!(!resolver.complete(resolution.ticket));
    }

    #[test]
    fn flee_without_encounter_is_rejected() {
        let (mut resolver, _) = setup();
        assert_eq!(
            resolver.flee(0),
            ActionOutcome::Rejected {
                rejection: Rejection::NoEncounter
            }
        );
        assert!(resolver.is_idle());
    }
}
