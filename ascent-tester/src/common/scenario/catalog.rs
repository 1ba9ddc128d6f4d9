use std::time::Duration;

use anyhow::Result;
use ascent_game::{Rules, Session};

use super::TestScenario;
use crate::logic::{PlayerStrategy, SimulationPlan, SimulationSummary, StartPlan};

const ROUND_TRIP_TICKETS: u32 = 4;
const ESCALATION_TICKETS: u32 = 60;
const SAFE_LEVEL_TICKETS: u32 = 500;
const RESTARTS: usize = 4;

pub fn catalog_scenarios() -> Vec<TestScenario> {
    vec![
        TestScenario::simulation(
            "regular-round-trip",
            "Regular Start Round Trip",
            SimulationPlan::new(
                StartPlan::regular(ROUND_TRIP_TICKETS),
                PlayerStrategy::Unlucky,
            )
            .with_expectation(round_trip_expectation),
        ),
        TestScenario::simulation(
            "express-start",
            "Express Start",
            SimulationPlan::new(StartPlan::express(4, 1), PlayerStrategy::Reckless)
                .with_expectation(express_start_expectation),
        ),
        TestScenario::simulation(
            "cost-escalation",
            "Failure Cost Escalation",
            SimulationPlan::new(
                StartPlan::regular(ESCALATION_TICKETS),
                PlayerStrategy::Unlucky,
            )
            .with_expectation(cost_escalation_expectation),
        ),
        TestScenario::simulation(
            "safe-levels",
            "Safe Level Immunity",
            SimulationPlan::new(
                StartPlan::regular(SAFE_LEVEL_TICKETS),
                PlayerStrategy::Unlucky,
            )
            .with_expectation(safe_levels_expectation),
        ),
        TestScenario::simulation(
            "stale-responses",
            "Out-of-Order Oracle Answers",
            SimulationPlan::new(StartPlan::regular(40), PlayerStrategy::Reckless)
                .with_sessions(2)
                .with_latency(Duration::from_millis(20))
                .with_expectation(answers_arrived_expectation),
        ),
        TestScenario::simulation(
            "quit-reset",
            "Quit and Restart",
            SimulationPlan::new(StartPlan::regular(8), PlayerStrategy::Cautious)
                .with_sessions(RESTARTS)
                .with_max_actions(4_000)
                .with_expectation(quit_reset_expectation),
        ),
        TestScenario::simulation(
            "cautious-climb",
            "Cautious Climb",
            SimulationPlan::new(StartPlan::regular(15), PlayerStrategy::Cautious)
                .with_expectation(single_session_expectation),
        ),
        TestScenario::simulation(
            "reckless-climb",
            "Reckless Climb",
            SimulationPlan::new(StartPlan::regular(15), PlayerStrategy::Reckless)
                .with_expectation(single_session_expectation),
        ),
        TestScenario::simulation(
            "random-walk",
            "Random Input Walk",
            SimulationPlan::new(StartPlan::regular(6), PlayerStrategy::Chaos)
                .with_max_actions(500)
                .with_expectation(random_walk_expectation),
        ),
    ]
}

/// Failures the given pool covers after the entry ticket, charged in table order.
fn failures_covered(rules: &Rules, tickets: u32) -> u32 {
    let budget = u64::from(tickets.saturating_sub(1));
    let mut count = 0;
    while count < rules.max_level && rules.cumulative_failure_cost(count + 1) <= budget {
        count += 1;
    }
    count
}

fn ended_cleanly(summary: &SimulationSummary) -> Result<()> {
    anyhow::ensure!(
        summary.final_session == Session::default(),
        "Declining a failure should restore the baseline, got {:?}",
        summary.final_session
    );
    anyhow::ensure!(
        summary.advisory.is_none(),
        "Advisory should be discarded after quitting"
    );
    Ok(())
}

fn round_trip_expectation(summary: &SimulationSummary) -> Result<()> {
    anyhow::ensure!(
        summary.failures_paid == 3,
        "Three tickets should pay failures costing 0+1+2, paid {}",
        summary.failures_paid
    );
    anyhow::ensure!(summary.quits == 1, "Player should quit once");
    ended_cleanly(summary)
}

fn express_start_expectation(summary: &SimulationSummary) -> Result<()> {
    let rules = Rules::default_config();
    anyhow::ensure!(
        summary.highest_level >= rules.express_start_level,
        "Express start should begin at level {}, highest was {}",
        rules.express_start_level,
        summary.highest_level
    );
    anyhow::ensure!(
        summary
            .action_log
            .iter()
            .any(|entry| entry == "express-start -> applied"),
        "Express start was not applied"
    );
    if summary.final_session.started {
        anyhow::ensure!(
            summary.final_session.is_express_start && summary.final_session.express_tickets == 0,
            "Express session lost its mode or kept its express ticket"
        );
    }
    Ok(())
}

fn cost_escalation_expectation(summary: &SimulationSummary) -> Result<()> {
    let rules = Rules::default_config();
    let expected = failures_covered(&rules, ESCALATION_TICKETS);
    anyhow::ensure!(
        summary.failures_paid == expected,
        "{ESCALATION_TICKETS} tickets should cover {expected} failures, paid {}",
        summary.failures_paid
    );
    ended_cleanly(summary)
}

fn safe_levels_expectation(summary: &SimulationSummary) -> Result<()> {
    let rules = Rules::default_config();
    let risky = rules.risky_levels_from(1);
    anyhow::ensure!(summary.reached_top, "Player should reach the top level");
    anyhow::ensure!(
        summary.failures_paid == risky,
        "Exactly one failure per risky level ({risky}), paid {}",
        summary.failures_paid
    );
    Ok(())
}

fn answers_arrived_expectation(summary: &SimulationSummary) -> Result<()> {
    anyhow::ensure!(
        summary.deliveries.applied > 0,
        "No oracle answer was applied"
    );
    anyhow::ensure!(
        summary.sessions_started == 2,
        "Both sessions should start, started {}",
        summary.sessions_started
    );
    Ok(())
}

fn quit_reset_expectation(summary: &SimulationSummary) -> Result<()> {
    anyhow::ensure!(
        summary.sessions_started == RESTARTS,
        "Expected {RESTARTS} sessions, started {}",
        summary.sessions_started
    );
    anyhow::ensure!(
        summary.quits >= RESTARTS - 1,
        "Each restart should follow a quit, saw {}",
        summary.quits
    );
    Ok(())
}

fn single_session_expectation(summary: &SimulationSummary) -> Result<()> {
    anyhow::ensure!(
        summary.sessions_started == 1,
        "Session should start once, started {}",
        summary.sessions_started
    );
    anyhow::ensure!(
        summary.reached_top || summary.quits == 1,
        "Climb should end at the top or with a quit"
    );
    Ok(())
}

fn random_walk_expectation(summary: &SimulationSummary) -> Result<()> {
    anyhow::ensure!(
        summary.ignored_actions > 0,
        "Random input should hit at least one blocked control"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coverage_follows_cumulative_costs() {
        let rules = Rules::default_config();
        assert_eq!(failures_covered(&rules, 1), 1);
        assert_eq!(failures_covered(&rules, ROUND_TRIP_TICKETS), 3);
        assert_eq!(failures_covered(&rules, ESCALATION_TICKETS), 9);
    }

    #[test]
    fn scenario_keys_are_unique() {
        let scenarios = catalog_scenarios();
        let mut keys: Vec<_> = scenarios.iter().map(|scenario| scenario.key).collect();
        keys.sort_unstable();
        keys.dedup();
        assert_eq!(keys.len(), scenarios.len());
    }
}
