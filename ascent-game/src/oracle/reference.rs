//! In-process oracle computing the same figures as the remote calculation service.
//!
//! The remote service's accounting quirks are kept so both oracles agree on
//! every request: express sessions pay one extra ticket in the affordability
//! check, and the max-failures answer charges the entry ticket again on top
//! of the already-spent count it receives for regular starts.
use async_trait::async_trait;

use crate::ProbabilityOracle;
use crate::constants::START_TICKET_COST;
use crate::numbers::{clamp_non_negative, u32_to_usize};
use crate::oracle::binomial;
use crate::oracle::{
    MaxFailuresRequest, MaxFailuresResponse, OracleError, ProbabilityRequest, ProbabilityResponse,
};
use crate::rules::Rules;

#[derive(Debug, Clone, Default)]
pub struct ReferenceOracle {
    rules: Rules,
}

impl ReferenceOracle {
    #[must_use]
    pub const fn new(rules: Rules) -> Self {
        Self { rules }
    }

    #[must_use]
    pub const fn rules(&self) -> &Rules {
        &self.rules
    }

    /// How many consecutive failures, starting at failure number `first`, fit in `budget`.
    #[must_use]
    pub fn failures_affordable(&self, first: u32, budget: u64) -> u32 {
        let last_index = self.rules.cost_table.len().saturating_sub(1);
        let mut index = first;
        let mut left = budget;
        let mut count: u32 = 0;
        while u32_to_usize(index) < last_index {
            let cost = u64::from(self.rules.failure_cost(index));
            if cost > left {
                return count;
            }
            left -= cost;
            count = count.saturating_add(1);
            index += 1;
        }
        let tail = u64::from(self.rules.failure_cost(index));
        if tail == 0 {
            return u32::MAX;
        }
        count.saturating_add(u32::try_from(left / tail).unwrap_or(u32::MAX))
    }

    /// Failures covered by the tickets left after the entry ticket was spent.
    #[must_use]
    pub fn max_failures_covered(&self, regular_tickets: u32, is_express_start: bool) -> u32 {
        if is_express_start {
            return self.failures_affordable(0, u64::from(regular_tickets));
        }
        let entry = u64::from(START_TICKET_COST);
        match u64::from(regular_tickets).checked_sub(entry * 2) {
            Some(budget) => self.failures_affordable(0, budget),
            None => 0,
        }
    }

    #[must_use]
    pub fn calculate(&self, request: &ProbabilityRequest) -> ProbabilityResponse {
        let rules = &self.rules;
        let failure_probability = rules.failure_probability;
        let remaining = u64::from(request.remaining_tickets);

        let trials = rules.risky_levels_from(request.level);
        let express_surcharge = u64::from(request.is_express_start);
        let affordable = remaining
            .checked_sub(express_surcharge)
            .map_or(0, |budget| {
                self.failures_affordable(request.total_failures, budget)
            });
        let current_probability = binomial::cdf(affordable, trials, failure_probability);

        let restart_trials = rules.risky_levels_from(rules.start_level(request.is_express_start));
        let restart_affordable = remaining
            .checked_sub(u64::from(START_TICKET_COST))
            .map_or(0, |budget| self.failures_affordable(0, budget));
        let restart_probability =
            binomial::cdf(restart_affordable, restart_trials, failure_probability);

        ProbabilityResponse {
            current_probability,
            restart_probability,
            expected_additional_cost: self.expected_additional_cost(
                trials,
                request.total_failures,
            ),
            next_failure_cost: rules.failure_cost(request.total_failures),
            is_safe_level: Some(rules.is_safe_level(request.level)),
            error: None,
        }
    }

    /// Expected tickets spent on failures over `trials` risky levels.
    #[must_use]
    pub fn expected_additional_cost(&self, trials: u32, total_failures: u32) -> f64 {
        let mut expected = 0.0;
        let mut charge_for_k = 0.0;
        for k in 0..=trials {
            if k > 0 {
                let index = total_failures.saturating_add(k - 1);
                charge_for_k += f64::from(self.rules.failure_cost(index));
            }
            expected +=
                binomial::pmf(k, trials, self.rules.failure_probability) * charge_for_k;
        }
        clamp_non_negative(expected)
    }
}

#[async_trait]
impl ProbabilityOracle for ReferenceOracle {
    async fn probability(
        &self,
        request: &ProbabilityRequest,
    ) -> Result<ProbabilityResponse, OracleError> {
        Ok(self.calculate(request))
    }

    async fn max_failures(
        &self,
        request: &MaxFailuresRequest,
    ) -> Result<MaxFailuresResponse, OracleError> {
        Ok(MaxFailuresResponse {
            max_failures_covered: self
                .max_failures_covered(request.regular_tickets, request.is_express_start),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn oracle() -> ReferenceOracle {
        ReferenceOracle::default()
    }

    #[test]
    fn affordability_walks_table_then_tail() {
        let oracle = oracle();
        assert_eq!(oracle.failures_affordable(0, 0), 1);
        assert_eq!(oracle.failures_affordable(0, 3), 3);
        assert_eq!(oracle.failures_affordable(0, 15), 5);
        assert_eq!(oracle.failures_affordable(0, 35), 7);
        assert_eq!(oracle.failures_affordable(3, 3), 0);
        assert_eq!(oracle.failures_affordable(9, 25), 2);
    }

    #[test]
    fn zero_tail_means_unbounded() {
        let rules = Rules {
            cost_table: vec![0],
            ..Rules::default_config()
        };
        let oracle = ReferenceOracle::new(rules);
        assert_eq!(oracle.failures_affordable(0, 0), u32::MAX);
    }

    #[test]
    fn max_failures_matches_service_accounting() {
        let oracle = oracle();
        assert_eq!(oracle.max_failures_covered(0, false), 0);
        assert_eq!(oracle.max_failures_covered(1, false), 0);
        assert_eq!(oracle.max_failures_covered(2, false), 1);
        assert_eq!(oracle.max_failures_covered(5, false), 3);
        assert_eq!(oracle.max_failures_covered(0, true), 1);
        assert_eq!(oracle.max_failures_covered(3, true), 3);
    }

    #[test]
    fn next_failure_cost_and_safe_flag_follow_rules() {
        let oracle = oracle();
        let response = oracle.calculate(&ProbabilityRequest {
            level: 10,
            remaining_tickets: 4,
            total_failures: 6,
            is_express_start: false,
        });
        assert_eq!(response.next_failure_cost, 10);
        assert_eq!(response.is_safe_level, Some(true));
        assert!(response.error.is_none());
    }

    #[test]
    fn probabilities_grow_with_tickets() {
        let oracle = oracle();
        let poor = oracle.calculate(&ProbabilityRequest {
            level: 1,
            remaining_tickets: 2,
            total_failures: 0,
            is_express_start: false,
        });
        let rich = oracle.calculate(&ProbabilityRequest {
            level: 1,
            remaining_tickets: 200,
            total_failures: 0,
            is_express_start: false,
        });
        assert!(poor.current_probability < rich.current_probability);
        assert!(rich.current_probability > 0.99);
        assert!((0.0..=1.0).contains(&poor.restart_probability));
    }

    #[test]
    fn top_level_is_certain() {
        let oracle = oracle();
        let response = oracle.calculate(&ProbabilityRequest {
            level: 50,
            remaining_tickets: 0,
            total_failures: 3,
            is_express_start: true,
        });
        assert!((response.current_probability - 1.0).abs() < f64::EPSILON);
        assert!(response.expected_additional_cost.abs() < f64::EPSILON);
    }

    #[test]
    fn expected_cost_for_single_trial() {
        let oracle = oracle();
        // One risky level: a failure happens with p = 0.25 and costs table[total_failures].
        assert!((oracle.expected_additional_cost(1, 2) - 0.5).abs() < 1e-12);
        assert!(oracle.expected_additional_cost(1, 0).abs() < 1e-12);
        assert!(oracle.expected_additional_cost(0, 4).abs() < 1e-12);
    }
}
