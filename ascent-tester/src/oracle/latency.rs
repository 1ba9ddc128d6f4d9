use std::sync::{Arc, Mutex};
use std::time::Duration;

use ascent_game::{
    MaxFailuresRequest, MaxFailuresResponse, OracleError, ProbabilityOracle, ProbabilityRequest,
    ProbabilityResponse,
};
use async_trait::async_trait;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

/// Delays every call by a seeded random amount so answers overtake each other.
pub struct JitterOracle {
    inner: Arc<dyn ProbabilityOracle>,
    rng: Mutex<ChaCha20Rng>,
    max_latency: Duration,
}

impl JitterOracle {
    #[must_use]
    pub fn new(inner: Arc<dyn ProbabilityOracle>, seed: u64, max_latency: Duration) -> Self {
        Self {
            inner,
            rng: Mutex::new(ChaCha20Rng::seed_from_u64(seed)),
            max_latency,
        }
    }

    fn next_delay(&self) -> Duration {
        let ceiling = u64::try_from(self.max_latency.as_micros()).unwrap_or(u64::MAX);
        if ceiling == 0 {
            return Duration::ZERO;
        }
        let Ok(mut rng) = self.rng.lock() else {
            return Duration::ZERO;
        };
        Duration::from_micros(rng.gen_range(0..=ceiling))
    }

    async fn pause(&self) {
        let delay = self.next_delay();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl ProbabilityOracle for JitterOracle {
    async fn probability(
        &self,
        request: &ProbabilityRequest,
    ) -> Result<ProbabilityResponse, OracleError> {
        self.pause().await;
        self.inner.probability(request).await
    }

    async fn max_failures(
        &self,
        request: &MaxFailuresRequest,
    ) -> Result<MaxFailuresResponse, OracleError> {
        self.pause().await;
        self.inner.max_failures(request).await
    }
}
