//! Oracle-derived figures shown next to the session. Never read by transitions.
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Advisory {
    pub current_probability: f64,
    pub restart_probability: f64,
    pub expected_additional_cost: f64,
    /// The oracle's view of the next failure charge. Display only; charges use the local table.
    pub oracle_failure_cost: u32,
}

/// Render a success probability for display.
///
/// Exactly 1 shows as `100%`; anything that would round up to it shows as
/// `> 99.99%`; everything else gets two decimals.
#[must_use]
pub fn format_probability(probability: f64) -> String {
    if !probability.is_finite() {
        return "0.00%".to_string();
    }
    if probability == 1.0 {
        return "100%".to_string();
    }
    let percentage = probability * 100.0;
    if percentage > 99.99 {
        return "> 99.99%".to_string();
    }
    format!("{percentage:.2}%")
}

#[must_use]
pub fn format_expected_cost(cost: f64) -> String {
    if !cost.is_finite() {
        return "0.00".to_string();
    }
    format!("{cost:.2}")
}
