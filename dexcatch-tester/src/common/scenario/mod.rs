use anyhow::Result;
use async_trait::async_trait;

use crate::live::HttpCatalog;
use crate::logic::{LogicTester, RunMode, SimulationPlan};

pub mod capture;
pub mod live;
pub mod persistence;

/// Turn cap applied to simulations replayed against the live catalog.
pub const LIVE_TURN_CAP: usize = 6;

#[derive(Clone, Copy)]
pub struct LiveCtx<'a> {
    pub catalog: &'a HttpCatalog,
    pub tester: &'a LogicTester,
    pub seed: u64,
    pub verbose: bool,
}

// Logic test scenario
#[derive(Debug, Clone)]
pub struct TestScenario {
    pub name: String,
    pub plan: SimulationPlan,
}

impl TestScenario {
    #[must_use]
    pub fn simulation(name: impl Into<String>, plan: SimulationPlan) -> Self {
        Self {
            name: name.into(),
            plan,
        }
    }
}

// Live catalog scenario
#[async_trait(?Send)]
pub trait LiveScenario {
    /// Whether the scenario has anything to check against the live catalog.
    fn runs_live(&self) -> bool {
        true
    }

    async fn run_live(&self, ctx: &LiveCtx<'_>) -> Result<()>;
}

// Combined scenario that can run both logic and live checks
pub trait CombinedScenario: LiveScenario {
    fn as_logic_scenario(&self) -> Option<TestScenario>;
}

#[derive(Clone)]
pub struct SimulationScenario {
    name: &'static str,
    plan: SimulationPlan,
    live: bool,
}

impl SimulationScenario {
    #[must_use]
    pub fn new(name: &'static str, plan: SimulationPlan) -> Self {
        Self {
            name,
            plan,
            live: false,
        }
    }

    /// Also replay a shortened plan against the live catalog.
    #[must_use]
    pub fn with_live_replay(mut self) -> Self {
        self.live = true;
        self
    }
}

#[async_trait(?Send)]
impl LiveScenario for SimulationScenario {
    fn runs_live(&self) -> bool {
        self.live
    }

    async fn run_live(&self, ctx: &LiveCtx<'_>) -> Result<()> {
        let mut plan = self.plan.clone();
        plan.turns = plan.turns.min(LIVE_TURN_CAP);
        plan.catalog_size = None;
        let scenario = TestScenario::simulation(self.name, plan);
        let result = ctx
            .tester
            .run_against(&scenario, ctx.seed, 1, ctx.catalog, RunMode::Live)
            .await;
        if !result.passed {
            anyhow::bail!(result.failures.join("; "));
        }
        Ok(())
    }
}

impl CombinedScenario for SimulationScenario {
    fn as_logic_scenario(&self) -> Option<TestScenario> {
        Some(TestScenario::simulation(self.name, self.plan.clone()))
    }
}

const SCENARIOS: &[(&str, &str)] = &[
    ("smoke", "Basic encounter and capture loop (also replays live)"),
    ("forced-success", "Every draw succeeds; captures land and chain"),
    ("out-of-stock", "Empty Great Balls are refused without side effects"),
    ("bonus-cadence", "Milestone bonuses land exactly every 10 and 100 captures"),
    ("mutual-exclusion", "Actions and encounter rolls are ignored while resolving"),
    ("watchdog", "Stuck resolutions are cleared by the watchdog"),
    ("long-session", "Collector policy over a long session"),
    ("degraded-save", "Saves degrade under a tight storage quota"),
    ("import-malformed", "Malformed imports are rejected and exports round-trip"),
    ("live-smoke", "Catalog endpoints answer and decode (live only)"),
];

pub fn get_scenario(name: &str) -> Option<Box<dyn CombinedScenario>> {
    match name.trim().to_lowercase().as_str() {
        "smoke" => Some(Box::new(capture::smoke_scenario())),
        "forced-success" | "success" => Some(Box::new(capture::forced_success_scenario())),
        "out-of-stock" | "stock" => Some(Box::new(capture::out_of_stock_scenario())),
        "bonus-cadence" | "bonus" => Some(Box::new(capture::bonus_cadence_scenario())),
        "mutual-exclusion" | "exclusion" => {
            Some(Box::new(capture::mutual_exclusion_scenario()))
        }
        "watchdog" => Some(Box::new(capture::watchdog_scenario())),
        "long-session" | "long" => Some(Box::new(capture::long_session_scenario())),
        "degraded-save" | "quota" => Some(Box::new(persistence::degraded_save_scenario())),
        "import-malformed" | "import" => {
            Some(Box::new(persistence::import_malformed_scenario()))
        }
        "live-smoke" | "live" => Some(Box::new(live::LiveSmokeScenario::default())),
        _ => None,
    }
}

#[must_use]
pub fn list_scenarios() -> Vec<(String, String)> {
    SCENARIOS
        .iter()
        .map(|(key, description)| ((*key).to_string(), (*description).to_string()))
        .collect()
}

/// Every registered scenario key, in listing order.
#[must_use]
pub fn scenario_keys() -> Vec<String> {
    SCENARIOS.iter().map(|(key, _)| (*key).to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_listed_scenario_resolves() {
        for (key, _) in list_scenarios() {
            assert!(get_scenario(&key).is_some(), "{key} is not registered");
        }
        assert!(get_scenario("nope").is_none());
        assert!(get_scenario(" Smoke ").is_some());
    }

    #[test]
    fn live_only_scenario_has_no_logic_plan() {
        let live = get_scenario("live-smoke").unwrap();
        assert!(live.as_logic_scenario().is_none());
        assert!(live.runs_live());
        let smoke = get_scenario("smoke").unwrap();
        assert!(smoke.as_logic_scenario().is_some());
        assert!(smoke.runs_live());
        assert!(!get_scenario("watchdog").unwrap().runs_live());
    }
}
