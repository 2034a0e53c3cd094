mod common;
mod live;
mod logic;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use colored::Colorize;
use std::fs::File;
use std::io::{BufWriter, Write, stdout};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use common::scenario::{LiveCtx, get_scenario, list_scenarios, scenario_keys};
use common::{artifacts_dir, load_config, split_csv, write_failure_artifacts};
use dexcatch_game::DEFAULT_CATALOG_BASE;
use live::HttpCatalog;
use logic::{LogicTester, RunMode, ScenarioResult, resolve_seed_inputs};

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum TestMode {
    /// Offline simulations against a generated catalog (fast, deterministic)
    Logic,
    /// Checks against the live creature catalog over HTTP
    Live,
    /// Run both logic and live tests
    Both,
}

#[derive(Debug, Parser)]
#[command(name = "dexcatch-tester", version = "0.1.0")]
#[command(about = "Automated QA testing for Dexcatch - offline simulations and live catalog checks")]
struct Args {
    /// Test mode: logic (offline), live (network), or both
    #[arg(long, value_enum, default_value_t = TestMode::Logic)]
    mode: TestMode,

    /// Scenarios to run (comma-separated, or "all")
    #[arg(long, default_value = "smoke")]
    scenarios: String,

    /// List all available scenarios and exit
    #[arg(long)]
    list_scenarios: bool,

    /// Seeds to run (comma-separated; decimal, 0x hex, ranges like 1..5, or "random")
    #[arg(long, default_value = "1337")]
    seeds: String,

    /// Number of iterations per scenario (logic mode only)
    #[arg(long, default_value_t = 10)]
    iterations: usize,

    /// Output report format
    #[arg(long, default_value = "console")]
    #[arg(value_parser = ["json", "markdown", "console"])]
    report: String,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Optional path to write the report output instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    /// Optional JSON file overriding the capture tuning
    #[arg(long)]
    config: Option<PathBuf>,

    // Live-specific options
    /// Base URL of the creature catalog API - live mode only
    #[arg(long, default_value = DEFAULT_CATALOG_BASE)]
    catalog_url: String,

    /// Per-request timeout in seconds - live mode only
    #[arg(long, default_value_t = 10)]
    timeout_secs: u64,

    /// Artifacts directory for failed live runs
    #[arg(long, default_value = "target/test-artifacts")]
    artifacts_dir: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if maybe_list_scenarios(&args)? {
        return Ok(());
    }

    announce_banner();

    let start_time = Instant::now();
    let scenarios = expand_scenarios(&args.scenarios);
    let seeds = resolve_seed_inputs(&split_csv(&args.seeds))?;
    let config = load_config(args.config.as_deref())?;
    let tester = LogicTester::new(args.verbose, config);

    let mut all_results = run_logic_scenarios(&args, &scenarios, &seeds, &tester).await;
    all_results.extend(run_live_scenarios(&args, &scenarios, &seeds, &tester).await?);

    write_reports(&args, &all_results, start_time)?;

    if all_results.iter().any(|r| !r.passed) {
        std::process::exit(1);
    }

    Ok(())
}

fn maybe_list_scenarios(args: &Args) -> Result<bool> {
    if !args.list_scenarios {
        return Ok(false);
    }
    let mut output_target = OutputTarget::new(args.output.clone())?;
    writeln!(output_target.writer(), "Available scenarios:")?;
    for (key, description) in list_scenarios() {
        writeln!(output_target.writer(), "  {key:25} - {description}")?;
    }
    output_target.flush_inner()?;
    Ok(true)
}

fn announce_banner() {
    println!("{}", "🎮 Dexcatch Automated Tester".bright_cyan().bold());
    println!("{}", "================================".cyan());
}

fn expand_scenarios(scenarios_arg: &str) -> Vec<String> {
    let mut scenarios = split_csv(scenarios_arg);
    if scenarios.iter().any(|s| s == "all") {
        scenarios.retain(|s| s != "all");
        for key in scenario_keys() {
            if !scenarios.contains(&key) {
                scenarios.push(key);
            }
        }
    }
    scenarios
}

async fn run_logic_scenarios(
    args: &Args,
    scenarios: &[String],
    seeds: &[u64],
    tester: &LogicTester,
) -> Vec<ScenarioResult> {
    let mut results: Vec<ScenarioResult> = Vec::new();
    if !matches!(args.mode, TestMode::Logic | TestMode::Both) {
        return results;
    }

    println!("{}", "🧠 Running Logic Tests".bright_yellow().bold());
    println!("{}", "-".repeat(30).yellow());

    for scenario_name in scenarios {
        if let Some(combined_scenario) = get_scenario(scenario_name) {
            if let Some(logic_scenario) = combined_scenario.as_logic_scenario() {
                let scenario_results = tester
                    .run_scenario(&logic_scenario, seeds, args.iterations)
                    .await;
                results.extend(scenario_results);
            } else {
                eprintln!(
                    "⚠️  Scenario {} has no logic test implementation",
                    scenario_name.yellow()
                );
            }
        } else {
            eprintln!("⚠️  Unknown scenario: {}", scenario_name.yellow());
        }
    }

    results
}

async fn run_live_scenarios(
    args: &Args,
    scenarios: &[String],
    seeds: &[u64],
    tester: &LogicTester,
) -> Result<Vec<ScenarioResult>> {
    let mut results = Vec::new();
    if !matches!(args.mode, TestMode::Live | TestMode::Both) {
        return Ok(results);
    }

    println!("{}", "🌐 Running Live Catalog Tests".bright_blue().bold());
    println!("{}", "-".repeat(30).blue());

    let catalog = HttpCatalog::new(&args.catalog_url, Duration::from_secs(args.timeout_secs))
        .context("building catalog client")?;

    for scenario_name in scenarios {
        let Some(scenario) = get_scenario(scenario_name) else {
            eprintln!("⚠️  Unknown scenario: {}", scenario_name.yellow());
            continue;
        };
        if !scenario.runs_live() {
            if args.verbose {
                println!("⏭️  {scenario_name} has no live checks");
            }
            continue;
        }

        for &seed in seeds {
            let ctx = LiveCtx {
                catalog: &catalog,
                tester,
                seed,
                verbose: args.verbose,
            };
            let scenario_start = Instant::now();
            let outcome = scenario.run_live(&ctx).await;
            let duration = scenario_start.elapsed();

            let failures = match outcome {
                Ok(()) => {
                    println!(
                        "✅ [{} seed {seed}] {scenario_name} - {duration:?}",
                        "live".green()
                    );
                    Vec::new()
                }
                Err(e) => {
                    eprintln!(
                        "❌ [{} seed {seed}] {scenario_name} - {duration:?}: {e:#}",
                        "live".red()
                    );
                    let dir = artifacts_dir(&args.artifacts_dir, scenario_name, seed);
                    let context = serde_json::json!({
                        "scenario": scenario_name,
                        "seed": seed,
                        "catalog": catalog.base(),
                    });
                    if let Err(write_err) =
                        write_failure_artifacts(Path::new(&dir), Some(&context), &e)
                    {
                        log::warn!("could not write artifacts to {dir}: {write_err:#}");
                    }
                    vec![format!("{e:#}")]
                }
            };

            results.push(live_result(scenario_name, seed, duration, failures));
        }
    }

    Ok(results)
}

fn live_result(
    scenario_name: &str,
    seed: u64,
    duration: Duration,
    failures: Vec<String>,
) -> ScenarioResult {
    let passed = failures.is_empty();
    ScenarioResult {
        scenario_name: scenario_name.to_string(),
        mode: RunMode::Live,
        seed,
        passed,
        iterations_run: 1,
        successful_iterations: usize::from(passed),
        failures,
        average_duration: duration,
        performance_data: vec![duration],
        captures: 0,
    }
}

fn write_reports(args: &Args, results: &[ScenarioResult], start_time: Instant) -> Result<()> {
    let mut output_target = OutputTarget::new(args.output.clone())?;

    match args.report.as_str() {
        "json" => {
            if results.is_empty() {
                writeln!(&mut output_target, "[]")?;
            } else {
                logic::reports::generate_json_report(&mut output_target, results)?;
            }
        }
        "markdown" => {
            if results.is_empty() {
                writeln!(
                    &mut output_target,
                    "{}\n\n_No scenarios executed._",
                    logic::reports::MARKDOWN_TITLE
                )?;
            } else {
                logic::reports::generate_markdown_report(&mut output_target, results)?;
            }
        }
        _ => {
            if results.is_empty() {
                writeln!(&mut output_target, "No scenarios executed.")?;
            } else {
                logic::reports::generate_console_report(
                    &mut output_target,
                    results,
                    start_time.elapsed(),
                )?;
            }
        }
    }

    let duration = start_time.elapsed();
    writeln!(&mut output_target)?;
    writeln!(&mut output_target, "🏁 Total time: {duration:?}")?;
    output_target.flush_inner()?;
    Ok(())
}

enum OutputTarget {
    Stdout(BufWriter<std::io::Stdout>),
    File(BufWriter<File>),
}

impl OutputTarget {
    fn new(path: Option<PathBuf>) -> Result<Self> {
        if let Some(path) = path {
            let file = File::create(&path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            Ok(Self::File(BufWriter::new(file)))
        } else {
            Ok(Self::Stdout(BufWriter::new(stdout())))
        }
    }

    fn writer(&mut self) -> &mut dyn Write {
        match self {
            Self::Stdout(w) => w,
            Self::File(w) => w,
        }
    }

    fn flush_inner(&mut self) -> std::io::Result<()> {
        match self {
            Self::Stdout(w) => w.flush(),
            Self::File(w) => w.flush(),
        }
    }
}

impl Write for OutputTarget {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.writer().write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.flush_inner()
    }
}
