mod common;
mod interactive;
mod logic;
mod oracle;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use std::fs::File;
use std::io::{BufWriter, Write, stdout};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::io::BufReader;

use ascent_game::{Game, GameDriver, SyncConfig};
use common::scenario::{get_scenario, list_scenarios, scenario_keys};
use common::{load_rules, split_csv};
use logic::{LogicTester, ScenarioResult, Simulator, resolve_seed_inputs};
use oracle::{OracleKind, OracleSettings};

#[derive(Debug, Parser)]
#[command(name = "ascent-tester", version = "0.1.0")]
#[command(about = "Automated QA for the Ascent climb: seeded play-throughs against a probability oracle")]
struct Args {
    /// Scenarios to run (comma-separated, `all` for every scenario)
    #[arg(long, default_value = "smoke")]
    scenarios: String,

    /// List all available scenarios and exit
    #[arg(long)]
    list_scenarios: bool,

    /// Seeds to run (comma-separated, ranges like 1..=8 allowed)
    #[arg(long, default_value = "1337")]
    seeds: String,

    /// Number of iterations per scenario and seed
    #[arg(long, default_value_t = 10)]
    iterations: usize,

    /// Output report format
    #[arg(long, default_value = "console")]
    #[arg(value_parser = ["json", "markdown", "console", "csv"])]
    report: String,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Optional path to write the report output instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    /// Where probability answers come from
    #[arg(long, value_enum, default_value_t = OracleKind::Reference)]
    oracle: OracleKind,

    /// Base URL of the calculation service (http oracle only)
    #[arg(long, default_value = "http://localhost:5000")]
    oracle_url: String,

    /// Upper bound of the random delay added to each oracle answer
    #[arg(long, default_value_t = 3)]
    max_latency_ms: u64,

    /// Oracle request timeout, 0 to wait forever
    #[arg(long, default_value_t = 10_000)]
    timeout_ms: u64,

    /// JSON rules file overriding the built-in climb rules
    #[arg(long)]
    rules: Option<PathBuf>,

    /// Play by hand from stdin instead of running scenarios
    #[arg(long)]
    interactive: bool,
}

impl Args {
    fn oracle_settings(&self) -> OracleSettings {
        OracleSettings {
            kind: self.oracle,
            url: self.oracle_url.clone(),
            max_latency: Duration::from_millis(self.max_latency_ms),
        }
    }

    fn sync_config(&self) -> SyncConfig {
        SyncConfig {
            request_timeout: (self.timeout_ms > 0).then(|| Duration::from_millis(self.timeout_ms)),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if maybe_list_scenarios(&args)? {
        return Ok(());
    }

    let rules = load_rules(args.rules.as_deref())?;

    if args.interactive {
        return run_interactive_session(&args, rules).await;
    }

    announce_banner();

    let start_time = Instant::now();
    let scenarios = expand_scenarios(&args.scenarios);
    let seeds = resolve_seed_inputs(&split_csv(&args.seeds))?;
    let simulator = Simulator::new(rules, args.oracle_settings(), args.sync_config());

    let all_results = run_logic_scenarios(&args, &scenarios, &seeds, simulator).await;
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

    let mut out = open_output(args.output.as_deref())?;
    writeln!(out, "Available scenarios:")?;
    for (key, description) in list_scenarios() {
        writeln!(out, "  {key:25} - {description}")?;
    }
    out.flush()?;
    Ok(true)
}

fn announce_banner() {
    println!("{}", "🎮 Ascent Automated Tester".bright_cyan().bold());
    println!("{}", "================================".cyan());
}

fn expand_scenarios(scenarios_arg: &str) -> Vec<String> {
    let mut scenarios = split_csv(scenarios_arg);
    if scenarios.iter().any(|s| s == "all") {
        scenarios.retain(|s| s != "all");
        for key in scenario_keys() {
            if !scenarios.iter().any(|s| s == key) {
                scenarios.push(key.to_string());
            }
        }
    }
    scenarios
}

async fn run_logic_scenarios(
    args: &Args,
    scenarios: &[String],
    seeds: &[u64],
    simulator: Simulator,
) -> Vec<ScenarioResult> {
    println!("{}", "🧠 Running Logic Tests".bright_yellow().bold());
    println!("{}", "-".repeat(30).yellow());

    let logic_tester = LogicTester::new(simulator, args.verbose);
    let mut results = Vec::new();

    for scenario_name in scenarios {
        if let Some(scenario) = get_scenario(scenario_name) {
            let scenario_results = logic_tester
                .run_scenario(&scenario, seeds, args.iterations)
                .await;
            results.extend(scenario_results);
        } else {
            eprintln!("⚠️  Unknown scenario: {}", scenario_name.yellow());
        }
    }

    results
}

async fn run_interactive_session(args: &Args, rules: ascent_game::Rules) -> Result<()> {
    let oracle = args
        .oracle_settings()
        .build(&rules)
        .context("building oracle for interactive play")?;
    let mut driver = GameDriver::new(Game::new(rules), oracle, args.sync_config());
    let input = BufReader::new(tokio::io::stdin());
    let mut out = stdout().lock();
    interactive::run_interactive(&mut driver, input, &mut out).await
}

fn write_reports(args: &Args, results: &[ScenarioResult], start_time: Instant) -> Result<()> {
    let mut out = open_output(args.output.as_deref())?;
    let out = out.as_mut();

    match (args.report.as_str(), results.is_empty()) {
        ("json", true) => writeln!(out, "[]")?,
        ("json", false) => logic::reports::generate_json_report(out, results)?,
        ("markdown", true) => writeln!(
            out,
            "# Ascent Logic Test Results\n\n_No scenarios executed._"
        )?,
        ("markdown", false) => logic::reports::generate_markdown_report(out, results)?,
        ("csv", _) => logic::reports::generate_csv_report(out, results)?,
        (_, true) => writeln!(out, "No logic scenarios executed.")?,
        (_, false) => {
            logic::reports::generate_console_report(out, results, start_time.elapsed())?;
        }
    }

    if args.report == "console" {
        writeln!(out)?;
        writeln!(out, "🏁 Total time: {:?}", start_time.elapsed())?;
    }
    out.flush()?;
    Ok(())
}

/// Report sink: the `--output` file when given, stdout otherwise.
fn open_output(path: Option<&Path>) -> Result<Box<dyn Write>> {
    let Some(path) = path else {
        return Ok(Box::new(BufWriter::new(stdout())));
    };
    let file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    Ok(Box::new(BufWriter::new(file)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::ScenarioMetrics;

    fn base_args() -> Args {
        Args {
            scenarios: "smoke".to_string(),
            list_scenarios: false,
            seeds: "1337".to_string(),
            iterations: 1,
            report: "json".to_string(),
            verbose: false,
            output: None,
            oracle: OracleKind::Reference,
            oracle_url: "http://localhost:5000".to_string(),
            max_latency_ms: 0,
            timeout_ms: 10_000,
            rules: None,
            interactive: false,
        }
    }

    fn sample_result(passed: bool) -> ScenarioResult {
        ScenarioResult {
            scenario_name: "Smoke".to_string(),
            seed: 1337,
            strategy: "Reckless".to_string(),
            passed,
            iterations_run: 3,
            successful_iterations: if passed { 3 } else { 2 },
            failures: if passed {
                Vec::new()
            } else {
                vec!["failure".to_string()]
            },
            metrics: ScenarioMetrics::default(),
            average_duration: Duration::from_millis(10),
            performance_data: vec![Duration::from_millis(10)],
        }
    }

    #[test]
    fn expands_all_scenarios_keyword() {
        let expanded = expand_scenarios("smoke,all");
        assert_eq!(expanded[0], "smoke");
        assert_eq!(expanded.len(), scenario_keys().len());
        assert!(expanded.contains(&"quit-reset".to_string()));
    }

    #[test]
    fn expand_scenarios_without_all_preserves_order() {
        let expanded = expand_scenarios("stale-responses, smoke");
        assert_eq!(
            expanded,
            vec!["stale-responses".to_string(), "smoke".to_string()]
        );
    }

    #[test]
    fn zero_timeout_waits_forever() {
        let args = Args {
            timeout_ms: 0,
            ..base_args()
        };
        assert_eq!(args.sync_config().request_timeout, None);
        assert_eq!(
            base_args().sync_config().request_timeout,
            Some(Duration::from_secs(10))
        );
    }

    #[tokio::test]
    async fn run_logic_scenarios_skips_unknown_names() {
        let args = base_args();
        let simulator = Simulator::new(
            load_rules(None).unwrap(),
            args.oracle_settings(),
            args.sync_config(),
        );
        let results = run_logic_scenarios(
            &args,
            &["nope".to_string(), "smoke".to_string()],
            &[42],
            simulator,
        )
        .await;
        assert_eq!(results.len(), 1);
        assert!(results[0].passed, "{:?}", results[0].failures);
    }

    #[test]
    fn write_reports_emits_json_output() {
        let temp = std::env::temp_dir().join("ascent-test-report.json");
        let args = Args {
            output: Some(temp.clone()),
            ..base_args()
        };
        write_reports(&args, &[sample_result(false)], Instant::now()).unwrap();
        let content = std::fs::read_to_string(temp).unwrap();
        let json: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(json["results"][0]["passed"], false);
    }

    #[test]
    fn write_reports_handles_empty_markdown() {
        let temp = std::env::temp_dir().join("ascent-empty-report.md");
        let args = Args {
            report: "markdown".to_string(),
            output: Some(temp.clone()),
            ..base_args()
        };
        write_reports(&args, &[], Instant::now()).unwrap();
        let content = std::fs::read_to_string(temp).unwrap();
        assert!(content.contains("_No scenarios executed._"));
    }

    #[test]
    fn maybe_list_scenarios_writes_output() {
        let temp = std::env::temp_dir().join("ascent-scenarios.txt");
        let args = Args {
            list_scenarios: true,
            output: Some(temp.clone()),
            ..base_args()
        };
        assert!(maybe_list_scenarios(&args).unwrap());
        let content = std::fs::read_to_string(temp).unwrap();
        assert!(content.contains("Available scenarios:"));
        assert!(content.contains("smoke"));
    }

    #[test]
    fn open_output_writes_to_file() {
        let temp = std::env::temp_dir().join("ascent-output-target.txt");
        let mut out = open_output(Some(&temp)).unwrap();
        writeln!(out, "hello").unwrap();
        out.flush().unwrap();
        drop(out);
        let content = std::fs::read_to_string(temp).unwrap();
        assert_eq!(content, "hello\n");
    }
}
