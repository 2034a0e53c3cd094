use std::fmt;

use dexcatch_game::{BallKind, Encounter, Inventory};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use serde::{Serialize, Serializer};

/// What a policy wants to do with the active encounter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyAction {
    Throw(BallKind),
    Flee,
}

impl fmt::Display for PolicyAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Throw(ball) => write!(f, "throw {ball}"),
            Self::Flee => f.write_str("flee"),
        }
    }
}

/// Decision returned by a [`CapturePolicy`]
#[derive(Debug, Clone)]
pub struct PolicyDecision {
    pub action: PolicyAction,
    pub rationale: Option<&'static str>,
}

impl PolicyDecision {
    #[must_use]
    pub const fn new(action: PolicyAction, rationale: Option<&'static str>) -> Self {
        Self { action, rationale }
    }

    const fn throw(ball: BallKind, rationale: &'static str) -> Self {
        Self::new(PolicyAction::Throw(ball), Some(rationale))
    }
}

/// Everything a policy may look at before deciding.
#[derive(Debug, Clone, Copy)]
pub struct PolicyView<'a> {
    pub encounter: &'a Encounter,
    pub inventory: &'a Inventory,
    pub already_caught: bool,
}

/// Policy interface for automated play strategies.
pub trait CapturePolicy {
    /// Name used for logging/debug output.
    fn name(&self) -> &'static str;

    fn decide(&mut self, view: &PolicyView<'_>) -> PolicyDecision;
}

/// Built-in strategies for automated runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CaptureStrategy {
    PokeOnly,
    GreatOnly,
    Balanced,
    Collector,
    Chaotic,
}

impl CaptureStrategy {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::PokeOnly => "Poke Only",
            Self::GreatOnly => "Great Only",
            Self::Balanced => "Balanced",
            Self::Collector => "Collector",
            Self::Chaotic => "Chaotic",
        }
    }

    #[must_use]
    pub fn create_policy(self, seed: u64) -> Box<dyn CapturePolicy> {
        match self {
            Self::PokeOnly => Box::new(FixedBallPolicy(BallKind::Poke)),
            Self::GreatOnly => Box::new(FixedBallPolicy(BallKind::Great)),
            Self::Balanced => Box::new(BalancedPolicy),
            Self::Collector => Box::new(CollectorPolicy),
            Self::Chaotic => Box::new(ChaoticPolicy::new(seed)),
        }
    }
}

impl fmt::Display for CaptureStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for CaptureStrategy {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

/// Always throws the same ball, stock or not.
struct FixedBallPolicy(BallKind);

impl CapturePolicy for FixedBallPolicy {
    fn name(&self) -> &'static str {
        match self.0 {
            BallKind::Poke => "PokeOnly",
            BallKind::Great => "GreatOnly",
            BallKind::Ultra => "UltraOnly",
        }
    }

    fn decide(&mut self, _view: &PolicyView<'_>) -> PolicyDecision {
        PolicyDecision::throw(self.0, "fixed ball")
    }
}

/// Spends rare balls on rare creatures and new entries.
struct BalancedPolicy;

fn balanced_choice(view: &PolicyView<'_>) -> PolicyDecision {
    let rare = view.encounter.is_legendary || view.encounter.shiny;
    if rare && view.inventory.is_available(BallKind::Ultra) {
        return PolicyDecision::throw(BallKind::Ultra, "rare encounter");
    }
    if !view.already_caught && view.inventory.is_available(BallKind::Great) {
        return PolicyDecision::throw(BallKind::Great, "new entry");
    }
    PolicyDecision::throw(BallKind::Poke, "routine")
}

impl CapturePolicy for BalancedPolicy {
    fn name(&self) -> &'static str {
        "Balanced"
    }

    fn decide(&mut self, view: &PolicyView<'_>) -> PolicyDecision {
        balanced_choice(view)
    }
}

/// Like [`BalancedPolicy`] but skips anything already caught.
struct CollectorPolicy;

impl CapturePolicy for CollectorPolicy {
    fn name(&self) -> &'static str {
        "Collector"
    }

    fn decide(&mut self, view: &PolicyView<'_>) -> PolicyDecision {
        if view.already_caught && !view.encounter.shiny {
            return PolicyDecision::new(PolicyAction::Flee, Some("already caught"));
        }
        balanced_choice(view)
    }
}

/// Random throws and flees, including balls that may be out of stock.
struct ChaoticPolicy {
    rng: ChaCha20Rng,
}

impl ChaoticPolicy {
    fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha20Rng::seed_from_u64(seed ^ 0xC4A0_5EED),
        }
    }
}

impl CapturePolicy for ChaoticPolicy {
    fn name(&self) -> &'static str {
        "Chaotic"
    }

    fn decide(&mut self, _view: &PolicyView<'_>) -> PolicyDecision {
        if self.rng.gen_bool(0.15) {
            return PolicyDecision::new(PolicyAction::Flee, None);
        }
        let ball = BallKind::ALL[self.rng.gen_range(0..BallKind::ALL.len())];
        PolicyDecision::new(PolicyAction::Throw(ball), None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dexcatch_game::{StartingStock, Stock};

    fn wild(legendary: bool) -> Encounter {
        Encounter {
            id: 25,
            name: "sparky".into(),
            sprite: None,
            types: vec!["electric".into()],
            shiny: false,
            is_legendary: legendary,
        }
    }

    #[test]
    fn balanced_prefers_ultra_for_legendaries() {
        let inventory = Inventory::starting(&StartingStock::default());
        let encounter = wild(true);
        let view = PolicyView {
            encounter: &encounter,
            inventory: &inventory,
            already_caught: false,
        };
        let decision = CaptureStrategy::Balanced.create_policy(1).decide(&view);
        assert_eq!(decision.action, PolicyAction::Throw(BallKind::Ultra));
    }

    #[test]
    fn balanced_falls_back_to_poke_when_dry() {
        let mut inventory = Inventory::starting(&StartingStock::default());
        inventory.set_stock(BallKind::Great, Stock::Count(0));
        let encounter = wild(false);
        let view = PolicyView {
            encounter: &encounter,
            inventory: &inventory,
            already_caught: false,
        };
        let decision = CaptureStrategy::Balanced.create_policy(1).decide(&view);
        assert_eq!(decision.action, PolicyAction::Throw(BallKind::Poke));
    }

    #[test]
    fn collector_flees_known_creatures() {
        let inventory = Inventory::starting(&StartingStock::default());
        let encounter = wild(false);
        let view = PolicyView {
            encounter: &encounter,
            inventory: &inventory,
            already_caught: true,
        };
        let mut policy = CaptureStrategy::Collector.create_policy(9);
        assert_eq!(policy.decide(&view).action, PolicyAction::Flee);
        assert_eq!(policy.name(), "Collector");
    }

    #[test]
    fn chaotic_is_seed_stable() {
        let inventory = Inventory::starting(&StartingStock::default());
        let encounter = wild(false);
        let view = PolicyView {
            encounter: &encounter,
            inventory: &inventory,
            already_caught: false,
        };
        let mut a = CaptureStrategy::Chaotic.create_policy(42);
        let mut b = CaptureStrategy::Chaotic.create_policy(42);
        for _ in 0..20 {
            assert_eq!(a.decide(&view).action, b.decide(&view).action);
        }
    }
}
