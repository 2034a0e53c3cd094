use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use dexcatch_game::{CatalogSource, CatchConfig, FixtureCatalog};

use super::simulation::{SimulationPlan, SimulationSummary, Simulator};
use crate::common::scenario::TestScenario;

/// Where a scenario's catalog data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    Logic,
    Live,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub scenario_name: String,
    pub mode: RunMode,
    pub seed: u64,
    pub passed: bool,
    pub iterations_run: usize,
    pub successful_iterations: usize,
    pub failures: Vec<String>,
    #[serde(with = "duration_serde")]
    pub average_duration: Duration,
    #[serde(with = "duration_vec_serde")]
    pub performance_data: Vec<Duration>,
    /// Captures landed across all successful iterations.
    #[serde(default)]
    pub captures: usize,
}

pub struct LogicTester {
    verbose: bool,
    config: CatchConfig,
}

impl LogicTester {
    #[must_use]
    pub const fn new(verbose: bool, config: CatchConfig) -> Self {
        Self { verbose, config }
    }

    #[must_use]
    pub const fn config(&self) -> &CatchConfig {
        &self.config
    }

    /// Run `scenario` for every seed against a fixture catalog.
    #[allow(clippy::future_not_send)]
    pub async fn run_scenario(
        &self,
        scenario: &TestScenario,
        seeds: &[u64],
        iterations: usize,
    ) -> Vec<ScenarioResult> {
        let size = scenario.plan.config(&self.config).catalog_size;
        let catalog = FixtureCatalog::generated(size);
        let mut results = Vec::with_capacity(seeds.len());

        for &seed in seeds {
            if self.verbose {
                println!(
                    "🧪 Testing scenario: {} (strategy: {} seed: {seed})",
                    scenario.name.bright_white(),
                    scenario.plan.strategy
                );
            }
            let result = self
                .run_against(scenario, seed, iterations, &catalog, RunMode::Logic)
                .await;
            results.push(result);
        }

        results
    }

    /// Run `scenario` against any catalog source.
    #[allow(clippy::future_not_send)]
    pub async fn run_against<Src>(
        &self,
        scenario: &TestScenario,
        seed: u64,
        iterations: usize,
        source: &Src,
        mode: RunMode,
    ) -> ScenarioResult
    where
        Src: CatalogSource + ?Sized,
    {
        let simulator = Simulator::new(self.verbose);
        let mut successes = 0;
        let mut captures = 0;
        let mut failures = Vec::new();
        let mut performance_data = Vec::new();

        for i in 0..iterations {
            let start_time = Instant::now();
            let iteration_seed = seed.wrapping_add(u64::try_from(i).unwrap_or(u64::MAX));

            let outcome = simulator
                .run_plan(&scenario.plan, iteration_seed, &self.config, source)
                .await;
            let verdict = outcome.and_then(|summary| {
                match evaluate_expectations(&scenario.plan, &summary) {
                    Ok(()) => Ok(summary),
                    Err(err) => Err(err.context(describe(&summary))),
                }
            });

            match verdict {
                Ok(summary) => {
                    successes += 1;
                    captures += summary.metrics.captures;
                    let duration = start_time.elapsed();
                    performance_data.push(duration);
                    if self.verbose {
                        println!(
                            "  ✅ Iteration {}/{iterations} passed ({duration:?}) encounters:{} captures:{}",
                            i + 1,
                            summary.metrics.encounters,
                            summary.metrics.captures
                        );
                    }
                }
                Err(err) => {
                    let message = format!("Iteration {} (seed {iteration_seed}): {err:#}", i + 1);
                    if self.verbose {
                        println!(
                            "  ❌ Iteration {}/{iterations} failed: {}",
                            i + 1,
                            message.clone().red()
                        );
                    }
                    failures.push(message);
                }
            }
        }

        let average_duration = if performance_data.is_empty() {
            Duration::ZERO
        } else {
            performance_data.iter().sum::<Duration>()
                / u32::try_from(performance_data.len()).unwrap_or(1)
        };

        ScenarioResult {
            scenario_name: scenario.name.clone(),
            mode,
            seed,
            passed: failures.is_empty(),
            iterations_run: iterations,
            successful_iterations: successes,
            failures,
            average_duration,
            performance_data,
            captures,
        }
    }
}

fn evaluate_expectations(plan: &SimulationPlan, summary: &SimulationSummary) -> anyhow::Result<()> {
    if let Some(first) = summary.violations.first() {
        anyhow::bail!(
            "{} invariant violation(s), first: {first}",
            summary.violations.len()
        );
    }
    for expectation in &plan.expectations {
        expectation.evaluate(summary)?;
    }
    Ok(())
}

fn describe(summary: &SimulationSummary) -> String {
    format!(
        "strategy {}, {} turns, {} captures, {} first, stock {:?}, recent [{}]",
        summary.strategy,
        summary.turns.len(),
        summary.metrics.captures,
        summary.metrics.first_captures,
        summary.final_inventory,
        summary.trail(3)
    )
}

mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_micros().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let micros = u128::deserialize(deserializer)?;
        Ok(Duration::from_micros(u64::try_from(micros).unwrap_or(u64::MAX)))
    }
}

mod duration_vec_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(durations: &[Duration], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let micros: Vec<u128> = durations.iter().map(Duration::as_micros).collect();
        micros.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let micros = Vec::<u128>::deserialize(deserializer)?;
        Ok(micros
            .into_iter()
            .map(|m| Duration::from_micros(u64::try_from(m).unwrap_or(u64::MAX)))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::policy::CaptureStrategy;
    use crate::logic::simulation::RollPlan;

    fn scenario(plan: SimulationPlan) -> TestScenario {
        TestScenario::simulation("Probe", plan)
    }

    #[test]
    fn passing_plan_reports_every_iteration() {
        let tester = LogicTester::new(false, CatchConfig::default_config());
        let plan = SimulationPlan::new(CaptureStrategy::Balanced)
            .with_turns(10)
            .with_catalog_size(60);
        let results = tokio_test::block_on(tester.run_scenario(&scenario(plan), &[1, 2], 3));
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.passed));
        assert_eq!(results[0].successful_iterations, 3);
        assert_eq!(results[1].seed, 2);
        assert_eq!(results[0].mode, RunMode::Logic);
    }

    #[test]
    fn failing_expectation_is_captured_with_context() {
        let tester = LogicTester::new(false, CatchConfig::default_config());
        let plan = SimulationPlan::new(CaptureStrategy::PokeOnly)
            .with_turns(4)
            .with_rolls(RollPlan::Forced(0.99))
            .with_expectation(|summary: &SimulationSummary| {
                anyhow::ensure!(summary.metrics.captures > 0, "expected a capture");
                Ok(())
            });
        let results = tokio_test::block_on(tester.run_scenario(&scenario(plan), &[9], 2));
        let result = &results[0];
        assert!(!result.passed);
        assert_eq!(result.failures.len(), 2);
        assert!(result.failures[0].contains("expected a capture"));
        assert!(result.failures[0].contains("strategy Poke Only"));
    }

    #[test]
    fn durations_serialize_as_micros() {
        let result = ScenarioResult {
            scenario_name: "smoke".into(),
            mode: RunMode::Live,
            seed: 1,
            passed: true,
            iterations_run: 1,
            successful_iterations: 1,
            failures: Vec::new(),
            average_duration: Duration::from_millis(2),
            performance_data: vec![Duration::from_micros(5)],
            captures: 0,
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["average_duration"], 2000);
        assert_eq!(json["performance_data"][0], 5);
        assert_eq!(json["mode"], "live");
    }
}
