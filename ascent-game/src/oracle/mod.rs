//! Wire contract with the probability oracle.
//!
//! Field names follow the remote calculation service's JSON bodies.
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::advisory::Advisory;
use crate::state::Session;

pub mod binomial;
pub mod reference;

pub use reference::ReferenceOracle;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OracleError {
    #[error("oracle transport failed: {0}")]
    Transport(String),
    #[error("oracle answered with HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("oracle response was malformed: {0}")]
    Malformed(String),
    #[error("oracle reported an error: {0}")]
    Remote(String),
    #[error("oracle did not answer within {0:?}")]
    Timeout(Duration),
    #[error("oracle task ended without an answer")]
    Disconnected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProbabilityRequest {
    #[serde(rename = "current_level")]
    pub level: u32,
    pub remaining_tickets: u32,
    pub total_failures: u32,
    pub is_express_start: bool,
}

impl ProbabilityRequest {
    #[must_use]
    pub const fn for_session(session: &Session) -> Self {
        Self {
            level: session.level,
            remaining_tickets: session.regular_tickets,
            total_failures: session.total_failures,
            is_express_start: session.is_express_start,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbabilityResponse {
    pub current_probability: f64,
    pub restart_probability: f64,
    pub expected_additional_cost: f64,
    pub next_failure_cost: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_safe_level: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProbabilityResponse {
    /// Check the response and convert it into advisory figures.
    ///
    /// # Errors
    ///
    /// Returns [`OracleError::Remote`] when the service flagged an error in an
    /// otherwise successful body, and [`OracleError::Malformed`] when a figure
    /// falls outside its domain.
    pub fn into_advisory(self) -> Result<Advisory, OracleError> {
        if let Some(message) = self.error.filter(|message| !message.is_empty()) {
            return Err(OracleError::Remote(message));
        }
        for (name, value) in [
            ("current_probability", self.current_probability),
            ("restart_probability", self.restart_probability),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(OracleError::Malformed(format!(
                    "{name} {value} is outside [0, 1]"
                )));
            }
        }
        if !self.expected_additional_cost.is_finite() || self.expected_additional_cost < 0.0 {
            return Err(OracleError::Malformed(format!(
                "expected_additional_cost {} is not a non-negative number",
                self.expected_additional_cost
            )));
        }
        Ok(Advisory {
            current_probability: self.current_probability,
            restart_probability: self.restart_probability,
            expected_additional_cost: self.expected_additional_cost,
            oracle_failure_cost: self.next_failure_cost,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MaxFailuresRequest {
    pub regular_tickets: u32,
    pub is_express_start: bool,
}

impl MaxFailuresRequest {
    /// Built from the session right after `start`, so the entry ticket is already spent.
    #[must_use]
    pub const fn for_session(session: &Session) -> Self {
        Self {
            regular_tickets: session.regular_tickets,
            is_express_start: session.is_express_start,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaxFailuresResponse {
    pub max_failures_covered: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response() -> ProbabilityResponse {
        ProbabilityResponse {
            current_probability: 0.4,
            restart_probability: 0.2,
            expected_additional_cost: 12.5,
            next_failure_cost: 2,
            is_safe_level: Some(false),
            error: None,
        }
    }

    #[test]
    fn request_uses_service_field_names() {
        let session = Session {
            started: true,
            level: 12,
            regular_tickets: 6,
            total_failures: 2,
            ..Session::default()
        };
        let value = serde_json::to_value(ProbabilityRequest::for_session(&session)).unwrap();
        assert_eq!(
            value,
            json!({
                "current_level": 12,
                "remaining_tickets": 6,
                "total_failures": 2,
                "is_express_start": false
            })
        );
    }

    #[test]
    fn service_body_parses_without_optional_fields() {
        let parsed: ProbabilityResponse = serde_json::from_value(json!({
            "current_probability": 1,
            "restart_probability": 0.5,
            "expected_additional_cost": 0,
            "next_failure_cost": 4
        }))
        .unwrap();
        let advisory = parsed.into_advisory().unwrap();
        assert!((advisory.current_probability - 1.0).abs() < f64::EPSILON);
        assert_eq!(advisory.oracle_failure_cost, 4);
    }

    #[test]
    fn error_field_is_reported_as_remote_failure() {
        let mut body = response();
        body.error = Some("division by zero".to_string());
        assert_eq!(
            body.into_advisory(),
            Err(OracleError::Remote("division by zero".to_string()))
        );

        let mut empty = response();
        empty.error = Some(String::new());
        assert!(empty.into_advisory().is_ok());
    }

    #[test]
    fn out_of_range_figures_are_malformed() {
        let mut body = response();
        body.restart_probability = 1.5;
        assert!(matches!(
            body.into_advisory(),
            Err(OracleError::Malformed(_))
        ));

        let mut body = response();
        body.expected_additional_cost = f64::NAN;
        assert!(matches!(
            body.into_advisory(),
            Err(OracleError::Malformed(_))
        ));
    }
}
