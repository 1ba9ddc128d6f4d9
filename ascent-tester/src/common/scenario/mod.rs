pub mod catalog;
pub mod smoke;

use crate::logic::SimulationPlan;
use catalog::catalog_scenarios;

/// A named plan the logic tester runs per seed and iteration.
#[derive(Debug, Clone)]
pub struct TestScenario {
    pub key: &'static str,
    pub name: String,
    pub plan: SimulationPlan,
}

impl TestScenario {
    #[must_use]
    pub fn simulation(key: &'static str, name: impl Into<String>, plan: SimulationPlan) -> Self {
        Self {
            key,
            name: name.into(),
            plan,
        }
    }
}

fn all_scenarios() -> Vec<TestScenario> {
    let mut scenarios = vec![smoke::smoke_scenario()];
    scenarios.extend(catalog_scenarios());
    scenarios
}

pub fn get_scenario(name: &str) -> Option<TestScenario> {
    let key = name.trim().to_lowercase();
    all_scenarios()
        .into_iter()
        .find(|scenario| scenario.key == key)
}

pub fn list_scenarios() -> Vec<(&'static str, String)> {
    all_scenarios()
        .into_iter()
        .map(|scenario| (scenario.key, scenario.name))
        .collect()
}

/// Every scenario key, in listing order.
pub fn scenario_keys() -> Vec<&'static str> {
    all_scenarios()
        .into_iter()
        .map(|scenario| scenario.key)
        .collect()
}
