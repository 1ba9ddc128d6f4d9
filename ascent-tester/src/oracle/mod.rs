pub mod http;
pub mod latency;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use ascent_game::{ProbabilityOracle, ReferenceOracle, Rules};
use clap::ValueEnum;

pub use http::HttpOracle;
pub use latency::JitterOracle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OracleKind {
    /// In-process calculation (no network)
    Reference,
    /// Remote calculation service over HTTP
    Http,
}

/// Where oracle answers come from and how late they may be.
#[derive(Debug, Clone)]
pub struct OracleSettings {
    pub kind: OracleKind,
    pub url: String,
    pub max_latency: Duration,
}

impl OracleSettings {
    /// Base oracle without latency jitter.
    pub fn build(&self, rules: &Rules) -> Result<Arc<dyn ProbabilityOracle>> {
        Ok(match self.kind {
            OracleKind::Reference => Arc::new(ReferenceOracle::new(rules.clone())),
            OracleKind::Http => Arc::new(
                HttpOracle::new(&self.url)
                    .with_context(|| format!("connecting oracle at {}", self.url))?,
            ),
        })
    }

    /// Base oracle wrapped with seeded latency when a ceiling is configured.
    pub fn build_jittered(&self, rules: &Rules, seed: u64) -> Result<Arc<dyn ProbabilityOracle>> {
        let base = self.build(rules)?;
        if self.max_latency.is_zero() {
            return Ok(base);
        }
        Ok(Arc::new(JitterOracle::new(base, seed, self.max_latency)))
    }
}

impl Default for OracleSettings {
    fn default() -> Self {
        Self {
            kind: OracleKind::Reference,
            url: "http://localhost:5000".to_string(),
            max_latency: Duration::from_millis(3),
        }
    }
}
