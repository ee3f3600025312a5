//! Remote diabetes-risk prediction.

pub mod client;
pub mod wire;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{error::HealthResult, models::DiabetesAssessmentInput};

pub use client::PredictionClient;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Percentage, 0–100.
    pub probability: f64,
    pub explanation: Vec<String>,
}

/// Anything that can turn an assessment into a prediction.
#[async_trait]
pub trait Predictor: Send + Sync {
    /// Fails with `HealthError::Network` when no usable response arrived and
    /// `HealthError::Service` when the service answered with an error or
    /// an unreadable body.
    async fn predict(&self, input: &DiabetesAssessmentInput) -> HealthResult<Prediction>;
}
