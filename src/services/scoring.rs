//! Clients for the scoring service
//!
//! The dispatcher talks to scoring through [`ScoringClient`]. Two
//! implementations exist:
//! - [`HttpScoringClient`]: POSTs snapshots to a running scoring service
//! - [`LocalScoringClient`]: scores in-process with a [`Scorer`]

use crate::config::TrackingConfig;
use crate::error::{BreakinError, Result};
use crate::evaluation::Scorer;
use crate::types::{CodeSnapshot, EvaluationResult};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Path of the evaluate endpoint relative to the service base URL
pub const EVALUATE_PATH: &str = "/evaluate/code-snapshot";

/// Anything that can turn a snapshot into an evaluation
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ScoringClient: Send + Sync {
    async fn evaluate(&self, snapshot: &CodeSnapshot) -> Result<EvaluationResult>;
}

/// Error body returned by the scoring service
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// Scoring over HTTP
pub struct HttpScoringClient {
    base_url: String,
    client: reqwest::Client,
}

impl HttpScoringClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn from_config(config: &TrackingConfig) -> Result<Self> {
        Self::new(&config.api_base_url, config.request_timeout())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl ScoringClient for HttpScoringClient {
    async fn evaluate(&self, snapshot: &CodeSnapshot) -> Result<EvaluationResult> {
        let url = format!("{}{}", self.base_url, EVALUATE_PATH);
        debug!("POST {} (snapshot {})", url, snapshot.seq);

        let response = self.client.post(&url).json(snapshot).send().await?;
        let status = response.status();

        if status.is_success() {
            return Ok(response.json::<EvaluationResult>().await?);
        }

        let message = response
            .json::<ErrorBody>()
            .await
            .map(|body| body.error)
            .unwrap_or_else(|_| status.to_string());

        if status.is_client_error() {
            Err(BreakinError::InvalidSnapshot(message))
        } else {
            Err(BreakinError::Scoring(format!(
                "scoring service returned {}: {}",
                status, message
            )))
        }
    }
}

/// In-process scoring
#[derive(Clone)]
pub struct LocalScoringClient {
    scorer: Arc<Scorer>,
}

impl LocalScoringClient {
    pub fn new(scorer: Arc<Scorer>) -> Self {
        Self { scorer }
    }
}

#[async_trait]
impl ScoringClient for LocalScoringClient {
    async fn evaluate(&self, snapshot: &CodeSnapshot) -> Result<EvaluationResult> {
        self.scorer.evaluate(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{SessionIds, SessionMetrics};

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = HttpScoringClient::new("http://localhost:3000/", Duration::from_secs(1)).unwrap();
        assert_eq!(client.base_url(), "http://localhost:3000");
    }

    #[tokio::test]
    async fn test_local_client_scores() {
        let client = LocalScoringClient::new(Arc::new(Scorer::seeded(3)));
        let snapshot = CodeSnapshot::new(
            1,
            "fn main() {}".to_string(),
            SessionMetrics::new(),
            &SessionIds::new("u", "s", "t"),
        );
        let result = client.evaluate(&snapshot).await.unwrap();
        assert!(result.score <= 10.0);
    }

    #[tokio::test]
    async fn test_unreachable_service_is_http_error() {
        // port 9 (discard) is not expected to run an HTTP server
        let client = HttpScoringClient::new("http://127.0.0.1:9", Duration::from_millis(200)).unwrap();
        let snapshot = CodeSnapshot::new(
            1,
            String::new(),
            SessionMetrics::new(),
            &SessionIds::new("u", "s", "t"),
        );
        let err = client.evaluate(&snapshot).await.unwrap_err();
        assert!(matches!(err, BreakinError::Http(_)));
    }
}
