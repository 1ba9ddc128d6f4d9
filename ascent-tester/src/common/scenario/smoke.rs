use anyhow::Result;

use super::TestScenario;
use crate::logic::{PlayerStrategy, SimulationPlan, SimulationSummary, StartPlan};

const SMOKE_ACTIONS: usize = 24;

pub fn smoke_scenario() -> TestScenario {
    TestScenario::simulation(
        "smoke",
        "Smoke Test",
        SimulationPlan::new(StartPlan::regular(3), PlayerStrategy::Reckless)
            .with_max_actions(SMOKE_ACTIONS)
            .with_expectation(smoke_expectation),
    )
}

fn smoke_expectation(summary: &SimulationSummary) -> Result<()> {
    anyhow::ensure!(
        summary.sessions_started == 1,
        "Session should start once, started {}",
        summary.sessions_started
    );
    anyhow::ensure!(
        summary.highest_level >= 1,
        "Player should stand on level 1 or above, got {}",
        summary.highest_level
    );
    anyhow::ensure!(
        summary.actions <= SMOKE_ACTIONS,
        "Action cap exceeded: {}",
        summary.actions
    );
    if summary.final_session.started {
        anyhow::ensure!(
            summary.advisory.is_some(),
            "Running session should have advisory figures once settled"
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::simulation::DeliveryStats;
    use ascent_game::Session;

    fn summary(sessions_started: usize) -> SimulationSummary {
        SimulationSummary {
            seed: 1,
            strategy: PlayerStrategy::Reckless,
            sessions_started,
            actions: 5,
            ignored_actions: 0,
            failures_paid: 0,
            highest_level: 1,
            reached_top: false,
            quits: 0,
            final_session: Session::default(),
            advisory: None,
            expected_advisory: None,
            deliveries: DeliveryStats::default(),
            violations: Vec::new(),
            action_log: Vec::new(),
        }
    }

    #[test]
    fn smoke_requires_a_started_session() {
        assert!(smoke_expectation(&summary(1)).is_ok());
        assert!(smoke_expectation(&summary(0)).is_err());
    }
}
