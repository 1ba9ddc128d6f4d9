use std::time::Duration;

use anyhow::{Context, Result};
use ascent_game::{
    MaxFailuresRequest, MaxFailuresResponse, OracleError, ProbabilityOracle, ProbabilityRequest,
    ProbabilityResponse,
};
use async_trait::async_trait;
use log::debug;
use serde::Serialize;
use serde::de::DeserializeOwned;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const MAX_ERROR_BODY_CHARS: usize = 512;

/// JSON client for the remote calculation service.
///
/// `POST {base}/calculate` answers probability requests and
/// `POST {base}/max_failures` answers the once-per-session coverage request.
#[derive(Debug, Clone)]
pub struct HttpOracle {
    client: reqwest::Client,
    base_url: String,
}

impl HttpOracle {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .context("building HTTP client for the oracle")?;
        Ok(Self::with_client(client, base_url))
    }

    #[must_use]
    pub fn with_client(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, OracleError>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let url = format!("{}/{path}", self.base_url());
        debug!(target: "ascent::http", "POST {url}");
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|err| OracleError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(OracleError::Status {
                status: status.as_u16(),
                body: text.chars().take(MAX_ERROR_BODY_CHARS).collect(),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|err| OracleError::Transport(err.to_string()))?;
        serde_json::from_slice(&bytes).map_err(|err| OracleError::Malformed(err.to_string()))
    }
}

#[async_trait]
impl ProbabilityOracle for HttpOracle {
    async fn probability(
        &self,
        request: &ProbabilityRequest,
    ) -> Result<ProbabilityResponse, OracleError> {
        self.post("calculate", request).await
    }

    async fn max_failures(
        &self,
        request: &MaxFailuresRequest,
    ) -> Result<MaxFailuresResponse, OracleError> {
        self.post("max_failures", request).await
    }
}
