use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info, warn};

use crate::{
    config::AppConfig,
    error::{HealthError, HealthResult},
    models::DiabetesAssessmentInput,
};

use super::{
    wire::{PredictionRequest, PredictionResponse},
    Prediction, Predictor,
};

const MAX_ERROR_BODY_CHARS: usize = 200;
const RETRY_BACKOFF: Duration = Duration::from_millis(250);

/// HTTP client for `POST {base_url}/predict`.
///
/// Network failures are retried up to `max_retries` times with a linear
/// backoff. Service failures are returned immediately.
#[derive(Clone)]
pub struct PredictionClient {
    client: reqwest::Client,
    endpoint: String,
    max_retries: u32,
}

impl PredictionClient {
    pub fn new(base_url: &str, timeout: Duration) -> HealthResult<Self> {
        let base = base_url.trim().trim_end_matches('/');
        if base.is_empty() {
            return Err(HealthError::Config("prediction base URL is empty".into()));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| HealthError::Config(format!("failed to build HTTP client: {err}")))?;

        Ok(Self {
            client,
            endpoint: format!("{base}/predict"),
            max_retries: 0,
        })
    }

    pub fn from_config(config: &AppConfig) -> HealthResult<Self> {
        Ok(Self::new(&config.api_base_url, config.predict_timeout)?
            .with_max_retries(config.predict_retries))
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    async fn request(&self, body: &PredictionRequest<'_>) -> HealthResult<Prediction> {
        debug!("Requesting prediction from {}", self.endpoint);

        let response = self
            .client
            .post(&self.endpoint)
            .json(body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            warn!("Prediction service returned {status}");
            return Err(HealthError::Service(format!(
                "prediction endpoint returned {status}: {}",
                truncate(&text)
            )));
        }

        let bytes = response.bytes().await.map_err(transport_error)?;
        let parsed: PredictionResponse = serde_json::from_slice(&bytes).map_err(|err| {
            HealthError::Service(format!("malformed prediction response: {err}"))
        })?;

        let prediction = parsed.into_prediction()?;
        info!("Prediction received: probability {}%", prediction.probability);
        Ok(prediction)
    }
}

#[async_trait]
impl Predictor for PredictionClient {
    async fn predict(&self, input: &DiabetesAssessmentInput) -> HealthResult<Prediction> {
        let body = PredictionRequest::from(input);
        let mut attempt = 0;
        loop {
            match self.request(&body).await {
                Err(HealthError::Network(reason)) if attempt < self.max_retries => {
                    attempt += 1;
                    warn!(
                        "Prediction attempt {attempt} of {} failed: {reason}",
                        self.max_retries + 1
                    );
                    tokio::time::sleep(RETRY_BACKOFF * attempt).await;
                }
                outcome => return outcome,
            }
        }
    }
}

fn transport_error(err: reqwest::Error) -> HealthError {
    if err.is_builder() {
        HealthError::Config(format!("invalid prediction request: {err}"))
    } else if err.is_timeout() {
        HealthError::Network(format!("prediction request timed out: {err}"))
    } else {
        HealthError::Network(format!("prediction request failed: {err}"))
    }
}

fn truncate(text: &str) -> String {
    text.chars().take(MAX_ERROR_BODY_CHARS).collect()
}
