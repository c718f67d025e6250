mod common;
mod logic;
mod realtime;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use colored::Colorize;
use roadways_game::SteerMode;
use std::fs::File;
use std::io::{BufWriter, Write, stdout};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use common::scenario::{all_scenario_keys, get_scenario, list_scenarios};
use common::split_csv;
use logic::{
    DrivingStrategy, GameTester, LogicTester, PlayabilityAggregate, PlayabilityRecord, SeedInfo,
    TesterAssets, aggregate_playability, resolve_seed_inputs, run_playability_analysis,
};
use realtime::{DEFAULT_COMPRESSION, RealtimeOptions, run_realtime};

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum TestMode {
    /// Deterministic logic testing on a virtual clock (fast)
    Logic,
    /// Live tokio driver with compressed timers
    Realtime,
    /// Run both logic and realtime tests
    Both,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SteerArg {
    /// Obstacle marker with centre-line collisions
    Collision,
    /// Probabilistic dodge rolls
    Dodge,
}

impl From<SteerArg> for SteerMode {
    fn from(arg: SteerArg) -> Self {
        match arg {
            SteerArg::Collision => Self::Collision,
            SteerArg::Dodge => Self::Dodge,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "roadways-tester", version)]
#[command(about = "Automated QA testing for the Roadways bus trip engine")]
struct Args {
    /// Test mode: logic (virtual clock), realtime (tokio driver), or both
    #[arg(long, value_enum, default_value_t = TestMode::Logic)]
    mode: TestMode,

    /// Scenarios to run (comma-separated, or "all")
    #[arg(long, default_value = "smoke")]
    scenarios: String,

    /// List all available scenarios and exit
    #[arg(long)]
    list_scenarios: bool,

    /// Seeds to run (comma-separated, decimal or 0x hex)
    #[arg(long, default_value = "1337")]
    seeds: String,

    /// Number of iterations per scenario
    #[arg(long, default_value_t = 10)]
    iterations: usize,

    /// Output report format
    #[arg(long, default_value = "console")]
    #[arg(value_parser = ["json", "markdown", "console", "csv"])]
    report: String,

    /// Steering model for plans that do not pin one
    #[arg(long, value_enum)]
    steer_mode: Option<SteerArg>,

    /// Timer divisor for realtime runs
    #[arg(long, default_value_t = DEFAULT_COMPRESSION)]
    compression: u64,

    /// Wall-clock limit per realtime trip, in seconds
    #[arg(long, default_value_t = 60)]
    realtime_timeout: u64,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Optional path to write the report output instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,
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
    let seed_infos = resolve_seed_inputs(&split_csv(&args.seeds))?;
    let seeds: Vec<u64> = seed_infos.iter().map(|s| s.seed).collect();
    let game_tester = GameTester::new(Arc::new(TesterAssets::load_default()), args.verbose)
        .with_steer_mode(args.steer_mode.map(SteerMode::from));

    let mut all_results = run_logic_scenarios(&args, &scenarios, &seeds, &game_tester);
    all_results.extend(run_realtime_scenarios(&args, &seeds, &game_tester).await);

    let (playability_records, playability_aggregates) =
        gather_playability(&args, &game_tester, &seed_infos)?;

    write_reports(
        &args,
        &all_results,
        playability_records.as_deref(),
        playability_aggregates.as_deref(),
        start_time,
    )?;

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
    println!("{}", "🚌 Roadways Automated Tester".bright_cyan().bold());
    println!("{}", "================================".cyan());
}

fn expand_scenarios(scenarios_arg: &str) -> Vec<String> {
    let mut scenarios = split_csv(scenarios_arg);
    if scenarios.iter().any(|s| s.eq_ignore_ascii_case("all")) {
        scenarios.retain(|s| !s.eq_ignore_ascii_case("all"));
        for key in all_scenario_keys() {
            if !scenarios.contains(&key) {
                scenarios.push(key);
            }
        }
    }
    scenarios
}

fn run_logic_scenarios(
    args: &Args,
    scenarios: &[String],
    seeds: &[u64],
    game_tester: &GameTester,
) -> Vec<logic::ScenarioResult> {
    let mut results = Vec::new();
    if !matches!(args.mode, TestMode::Logic | TestMode::Both) {
        return results;
    }

    println!("{}", "🧠 Running Logic Tests".bright_yellow().bold());
    println!("{}", "-".repeat(30).yellow());

    let logic_tester = LogicTester::new(game_tester.clone());
    for scenario_name in scenarios {
        if let Some(scenario) = get_scenario(scenario_name) {
            results.extend(logic_tester.run_scenario(&scenario, seeds, args.iterations));
        } else {
            eprintln!("⚠️  Unknown scenario: {}", scenario_name.yellow());
        }
    }
    results
}

async fn run_realtime_scenarios(
    args: &Args,
    seeds: &[u64],
    game_tester: &GameTester,
) -> Vec<logic::ScenarioResult> {
    if !matches!(args.mode, TestMode::Realtime | TestMode::Both) {
        return Vec::new();
    }

    println!("{}", "⏱️  Running Realtime Tests".bright_blue().bold());
    println!("{}", "-".repeat(30).blue());

    let options = RealtimeOptions {
        compression: args.compression,
        deadline: Duration::from_secs(args.realtime_timeout.max(1)),
        steer_mode: args.steer_mode.map(SteerMode::from),
    };
    run_realtime(game_tester, &DrivingStrategy::ALL, seeds, &options).await
}

type PlayabilitySummary = (
    Option<Vec<PlayabilityRecord>>,
    Option<Vec<PlayabilityAggregate>>,
);

fn gather_playability(
    args: &Args,
    game_tester: &GameTester,
    seed_infos: &[SeedInfo],
) -> Result<PlayabilitySummary> {
    let wanted = matches!(args.report.as_str(), "console" | "csv")
        && matches!(args.mode, TestMode::Logic | TestMode::Both);
    if !wanted {
        return Ok((None, None));
    }
    let records = run_playability_analysis(game_tester, seed_infos, args.iterations)?;
    let aggregates = aggregate_playability(&records);
    Ok((Some(records), Some(aggregates)))
}

fn write_reports(
    args: &Args,
    results: &[logic::ScenarioResult],
    playability_records: Option<&[PlayabilityRecord]>,
    playability_aggregates: Option<&[PlayabilityAggregate]>,
    start_time: Instant,
) -> Result<()> {
    let mut output_target = OutputTarget::new(args.output.clone())?;

    match args.report.as_str() {
        "json" => {
            if results.is_empty() {
                writeln!(&mut output_target, "[]")?;
            } else {
                logic::reports::generate_json_report(&mut output_target, results)?;
            }
            output_target.flush_inner()?;
            return Ok(());
        }
        "markdown" => {
            if results.is_empty() {
                writeln!(
                    &mut output_target,
                    "# Roadways Logic Test Results\n\n_No scenarios executed._"
                )?;
            } else {
                logic::reports::generate_markdown_report(&mut output_target, results)?;
            }
        }
        "csv" => {
            if let Some(records) = playability_records {
                logic::reports::generate_csv_report(&mut output_target, records)?;
            } else {
                writeln!(&mut output_target, "[]")?;
            }
            output_target.flush_inner()?;
            return Ok(());
        }
        _ => {
            if results.is_empty() {
                writeln!(&mut output_target, "No scenarios executed.")?;
            } else {
                logic::reports::generate_console_report(
                    &mut output_target,
                    results,
                    playability_aggregates.unwrap_or(&[]),
                    start_time.elapsed(),
                )?;
                if playability_aggregates.is_none() {
                    writeln!(&mut output_target, "Playability data unavailable.")?;
                }
            }
        }
    }

    writeln!(&mut output_target)?;
    writeln!(&mut output_target, "🏁 Total time: {:?}", start_time.elapsed())?;
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
