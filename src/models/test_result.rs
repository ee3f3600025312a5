//! Test-result data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const DIABETES_TEST_NAME: &str = "Diabetes";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResultPayload {
    pub message: String,
    /// Percentage, 0–100.
    pub probability: f64,
}

/// One completed health test. Never modified once created.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TestResult {
    pub id: Uuid,
    pub test_name: String,
    pub date: DateTime<Utc>,
    pub result: ResultPayload,
    pub explanation: Vec<String>,
}

impl TestResult {
    pub fn diabetes(probability: f64, explanation: Vec<String>, date: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            test_name: DIABETES_TEST_NAME.into(),
            date,
            result: ResultPayload {
                message: diabetes_message(probability),
                probability,
            },
            explanation,
        }
    }
}

pub fn diabetes_message(probability: f64) -> String {
    format!("Probability of diabetes: {probability}%")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_keeps_fractional_probabilities() {
        assert_eq!(diabetes_message(72.5), "Probability of diabetes: 72.5%");
        assert_eq!(diabetes_message(40.0), "Probability of diabetes: 40%");
    }
}
