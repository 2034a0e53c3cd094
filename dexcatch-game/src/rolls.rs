//! Random draws used by the encounter generator and capture resolver.
use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;
use std::collections::VecDeque;

/// Source of uniform draws. Production code wraps a seeded RNG; tests script
/// the exact values.
pub trait RollSource {
    /// Uniform value in `[0, 1)`.
    fn unit(&mut self) -> f64;

    /// Uniform integer in `[low, high]`.
    fn between(&mut self, low: u32, high: u32) -> u32;
}

/// [`RollSource`] backed by any `rand` generator.
#[derive(Debug, Clone)]
pub struct RngRolls<R> {
    rng: R,
}

impl RngRolls<ChaCha20Rng> {
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: ChaCha20Rng::seed_from_u64(seed),
        }
    }
}

impl<R: RngCore> RngRolls<R> {
    pub const fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: RngCore> RollSource for RngRolls<R> {
    fn unit(&mut self) -> f64 {
        self.rng.r#gen::<f64>()
    }

    fn between(&mut self, low: u32, high: u32) -> u32 {
        if high <= low {
            return low;
        }
        self.rng.gen_range(low..=high)
    }
}

/// Scripted draws: queued values are consumed first, then the fallbacks repeat.
#[derive(Debug, Clone)]
pub struct ScriptedRolls {
    units: VecDeque<f64>,
    picks: VecDeque<u32>,
    fallback_unit: f64,
    fallback_pick: u32,
}

impl ScriptedRolls {
    /// Every unit draw returns `unit`; every integer draw returns its lower bound.
    #[must_use]
    pub const fn fixed(unit: f64) -> Self {
        Self {
            units: VecDeque::new(),
            picks: VecDeque::new(),
            fallback_unit: unit,
            fallback_pick: 0,
        }
    }

    #[must_use]
    pub fn with_units(mut self, units: impl IntoIterator<Item = f64>) -> Self {
        self.units.extend(units);
        self
    }

    #[must_use]
    pub fn with_picks(mut self, picks: impl IntoIterator<Item = u32>) -> Self {
        self.picks.extend(picks);
        self
    }

    #[must_use]
    pub const fn with_fallback_pick(mut self, pick: u32) -> Self {
        self.fallback_pick = pick;
        self
    }

    pub fn set_fallback_unit(&mut self, unit: f64) {
        self.fallback_unit = unit;
    }
}

impl RollSource for ScriptedRolls {
    fn unit(&mut self) -> f64 {
        self.units.pop_front().unwrap_or(self.fallback_unit)
    }

    fn between(&mut self, low: u32, high: u32) -> u32 {
        let pick = self.picks.pop_front().unwrap_or(self.fallback_pick);
        pick.clamp(low, high.max(low))
    }
}
