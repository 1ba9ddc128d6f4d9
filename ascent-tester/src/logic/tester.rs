use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use crate::common::scenario::TestScenario;
use crate::logic::simulation::{SimulationPlan, SimulationSummary, Simulator};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub scenario_name: String,
    pub seed: u64,
    pub strategy: String,
    pub passed: bool,
    pub iterations_run: usize,
    pub successful_iterations: usize,
    pub failures: Vec<String>,
    pub metrics: ScenarioMetrics,
    #[serde(with = "millis")]
    pub average_duration: Duration,
    #[serde(
        serialize_with = "millis::serialize_all",
        deserialize_with = "millis::deserialize_all"
    )]
    pub performance_data: Vec<Duration>,
}

/// Totals across every iteration of one scenario/seed pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScenarioMetrics {
    pub actions: usize,
    pub ignored_actions: usize,
    pub failures_paid: u64,
    pub highest_level: u32,
    pub tops_reached: usize,
    pub quits: usize,
    pub responses_applied: usize,
    pub responses_superseded: usize,
    pub responses_stale: usize,
    pub responses_failed: usize,
    pub final_probability_sum: f64,
}

impl ScenarioMetrics {
    fn absorb(&mut self, summary: &SimulationSummary) {
        self.actions += summary.actions;
        self.ignored_actions += summary.ignored_actions;
        self.failures_paid += u64::from(summary.failures_paid);
        self.highest_level = self.highest_level.max(summary.highest_level);
        self.tops_reached += usize::from(summary.reached_top);
        self.quits += summary.quits;
        self.responses_applied += summary.deliveries.applied;
        self.responses_superseded += summary.deliveries.superseded;
        self.responses_stale += summary.deliveries.stale;
        self.responses_failed += summary.deliveries.failed;
        if let Some(advisory) = summary.advisory {
            self.final_probability_sum += advisory.current_probability;
        }
    }
}

pub struct LogicTester {
    simulator: Simulator,
    verbose: bool,
}

impl LogicTester {
    pub const fn new(simulator: Simulator, verbose: bool) -> Self {
        Self { simulator, verbose }
    }

    pub async fn run_scenario(
        &self,
        scenario: &TestScenario,
        seeds: &[u64],
        iterations: usize,
    ) -> Vec<ScenarioResult> {
        let mut results = Vec::with_capacity(seeds.len());
        for &seed in seeds {
            if self.verbose {
                println!(
                    "🧪 {} | {} | seed {seed}",
                    scenario.name.bright_white(),
                    scenario.plan.strategy
                );
            }
            results.push(self.run_single_scenario(scenario, seed, iterations).await);
        }
        results
    }

    async fn run_single_scenario(
        &self,
        scenario: &TestScenario,
        seed: u64,
        iterations: usize,
    ) -> ScenarioResult {
        let mut failures = Vec::new();
        let mut performance_data = Vec::with_capacity(iterations);
        let mut metrics = ScenarioMetrics::default();

        for (index, iteration_seed) in iteration_seeds(seed, iterations).enumerate() {
            let label = format!("Iteration {}/{iterations}", index + 1);
            let started = Instant::now();
            match self.run_iteration(scenario, iteration_seed, &mut metrics).await {
                Ok(summary) => {
                    let elapsed = started.elapsed();
                    performance_data.push(elapsed);
                    if self.verbose {
                        println!(
                            "  ✅ {label} passed ({elapsed:?}) top level:{} paid:{} applied:{} superseded:{}",
                            summary.highest_level,
                            summary.failures_paid,
                            summary.deliveries.applied,
                            summary.deliveries.superseded
                        );
                    }
                }
                Err(reason) => {
                    if self.verbose {
                        println!("  ❌ {label} failed: {}", reason.as_str().red());
                    }
                    failures.push(format!("{label} (seed {iteration_seed}): {reason}"));
                }
            }
        }

        let average_duration = mean_duration(&performance_data);
        ScenarioResult {
            scenario_name: scenario.name.clone(),
            seed,
            strategy: scenario.plan.strategy.label().to_string(),
            passed: failures.is_empty(),
            iterations_run: iterations,
            successful_iterations: performance_data.len(),
            failures,
            metrics,
            average_duration,
            performance_data,
        }
    }

    async fn run_iteration(
        &self,
        scenario: &TestScenario,
        seed: u64,
        metrics: &mut ScenarioMetrics,
    ) -> Result<SimulationSummary, String> {
        let summary = self
            .simulator
            .run_plan(&scenario.plan, seed)
            .await
            .map_err(|err| format!("{err:#}"))?;
        metrics.absorb(&summary);
        match evaluate_expectations(&scenario.plan, &summary) {
            None => Ok(summary),
            Some(err) => Err(format!(
                "{err} [{} after {} actions at level {}] {}",
                summary.strategy.label(),
                summary.actions,
                summary.final_session.level,
                summarize_action_path(&summary)
            )),
        }
    }
}

fn iteration_seeds(seed: u64, iterations: usize) -> impl Iterator<Item = u64> {
    let count = u64::try_from(iterations).unwrap_or(u64::MAX);
    (0..count).map(move |offset| seed.wrapping_add(offset))
}

fn mean_duration(samples: &[Duration]) -> Duration {
    match u32::try_from(samples.len()) {
        Ok(0) | Err(_) => Duration::ZERO,
        Ok(count) => samples.iter().sum::<Duration>() / count,
    }
}

fn evaluate_expectations(plan: &SimulationPlan, summary: &SimulationSummary) -> Option<String> {
    if let Some(violation) = summary.violations.first() {
        let extra = summary.violations.len() - 1;
        return Some(if extra == 0 {
            violation.clone()
        } else {
            format!("{violation} (+{extra} more)")
        });
    }
    for expectation in &plan.expectations {
        if let Err(err) = expectation(summary) {
            return Some(err.to_string());
        }
    }
    None
}

fn summarize_action_path(summary: &SimulationSummary) -> String {
    if summary.action_log.is_empty() {
        return "no actions recorded".to_string();
    }

    summary
        .action_log
        .iter()
        .rev()
        .take(3)
        .rev()
        .cloned()
        .collect::<Vec<_>>()
        .join(" | ")
}

/// Durations travel as whole milliseconds in every report format.
mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    fn to_millis(duration: &Duration) -> u64 {
        u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
    }

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(to_millis(duration))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }

    pub fn serialize_all<S: Serializer>(
        durations: &[Duration],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(durations.iter().map(to_millis))
    }

    pub fn deserialize_all<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<Duration>, D::Error> {
        let raw = Vec::<u64>::deserialize(deserializer)?;
        Ok(raw.into_iter().map(Duration::from_millis).collect())
    }
}
