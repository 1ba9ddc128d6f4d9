//! Climb rules: level layout and failure economy.
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{
    COST_TABLE, EXPRESS_START_LEVEL, FAILURE_PROBABILITY, MAX_LEVEL, MIN_LEVEL,
    SAFE_LEVEL_INTERVAL,
};
use crate::numbers::u32_to_usize;

#[derive(Debug, Error, PartialEq)]
pub enum RulesError {
    #[error("failed to parse rules JSON: {0}")]
    Parse(String),
    #[error("cost table must contain at least one entry")]
    EmptyCostTable,
    #[error("cost table must be non-decreasing (entry {index} drops from {previous} to {current})")]
    DecreasingCostTable {
        index: usize,
        previous: u32,
        current: u32,
    },
    #[error("max level must be at least 1, got {0}")]
    MaxLevelTooLow(u32),
    #[error("express start level {level} is outside 1..={max_level}")]
    ExpressStartOutOfRange { level: u32, max_level: u32 },
    #[error("safe level interval must be positive")]
    ZeroSafeInterval,
    #[error("failure probability {0} is outside [0, 1]")]
    FailureProbabilityOutOfRange(f64),
}

/// Level layout and failure economy for a climb.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rules {
    #[serde(default = "default_max_level")]
    pub max_level: u32,
    #[serde(default = "default_express_start_level")]
    pub express_start_level: u32,
    #[serde(default = "default_safe_level_interval")]
    pub safe_level_interval: u32,
    #[serde(default = "default_cost_table")]
    pub cost_table: Vec<u32>,
    #[serde(default = "default_failure_probability")]
    pub failure_probability: f64,
}

impl Default for Rules {
    fn default() -> Self {
        Self::default_config()
    }
}

impl Rules {
    /// Get default configuration
    #[must_use]
    pub fn default_config() -> Self {
        Self {
            max_level: MAX_LEVEL,
            express_start_level: EXPRESS_START_LEVEL,
            safe_level_interval: SAFE_LEVEL_INTERVAL,
            cost_table: COST_TABLE.to_vec(),
            failure_probability: FAILURE_PROBABILITY,
        }
    }

    /// Parse and validate a rule set. Missing fields fall back to the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or the rules are inconsistent.
    pub fn from_json(json: &str) -> Result<Self, RulesError> {
        let rules: Self =
            serde_json::from_str(json).map_err(|err| RulesError::Parse(err.to_string()))?;
        rules.validate()?;
        Ok(rules)
    }

    /// # Errors
    ///
    /// Returns the first inconsistency found in the rule set.
    pub fn validate(&self) -> Result<(), RulesError> {
        if self.cost_table.is_empty() {
            return Err(RulesError::EmptyCostTable);
        }
        if let Some(index) = self.cost_table.windows(2).position(|pair| pair[1] < pair[0]) {
            return Err(RulesError::DecreasingCostTable {
                index: index + 1,
                previous: self.cost_table[index],
                current: self.cost_table[index + 1],
            });
        }
        if self.max_level < MIN_LEVEL {
            return Err(RulesError::MaxLevelTooLow(self.max_level));
        }
        if !(MIN_LEVEL..=self.max_level).contains(&self.express_start_level) {
            return Err(RulesError::ExpressStartOutOfRange {
                level: self.express_start_level,
                max_level: self.max_level,
            });
        }
        if self.safe_level_interval == 0 {
            return Err(RulesError::ZeroSafeInterval);
        }
        if !(0.0..=1.0).contains(&self.failure_probability) {
            return Err(RulesError::FailureProbabilityOutOfRange(
                self.failure_probability,
            ));
        }
        Ok(())
    }

    /// Charge for the next failure given how many the session has already paid for.
    #[must_use]
    pub fn failure_cost(&self, total_failures: u32) -> u32 {
        let last = self.cost_table.len().saturating_sub(1);
        let index = u32_to_usize(total_failures).min(last);
        self.cost_table.get(index).copied().unwrap_or(0)
    }

    /// Sum of the first `failures` charges.
    #[must_use]
    pub fn cumulative_failure_cost(&self, failures: u32) -> u64 {
        (0..failures)
            .map(|index| u64::from(self.failure_cost(index)))
            .sum()
    }

    #[must_use]
    pub const fn is_safe_level(&self, level: u32) -> bool {
        self.safe_level_interval != 0 && level % self.safe_level_interval == 0
    }

    #[must_use]
    pub const fn start_level(&self, express: bool) -> u32 {
        if express {
            self.express_start_level
        } else {
            MIN_LEVEL
        }
    }

    /// Number of levels in `level..=max_level` that can produce a failure.
    #[must_use]
    pub fn risky_levels_from(&self, level: u32) -> u32 {
        let first = level.max(MIN_LEVEL);
        if first > self.max_level {
            return 0;
        }
        let risky = (first..=self.max_level)
            .filter(|&candidate| !self.is_safe_level(candidate))
            .count();
        u32::try_from(risky).unwrap_or(u32::MAX)
    }
}

fn default_max_level() -> u32 {
    MAX_LEVEL
}

fn default_express_start_level() -> u32 {
    EXPRESS_START_LEVEL
}

fn default_safe_level_interval() -> u32 {
    SAFE_LEVEL_INTERVAL
}

fn default_cost_table() -> Vec<u32> {
    COST_TABLE.to_vec()
}

fn default_failure_probability() -> f64 {
    FAILURE_PROBABILITY
}
