use serde::{Deserialize, Serialize};

use crate::{
    error::{HealthError, HealthResult},
    models::DiabetesAssessmentInput,
};

use super::Prediction;

/// Request body for `POST /predict`. Booleans travel as 0/1.
#[derive(Debug, Serialize)]
pub struct PredictionRequest<'a> {
    pub gender: &'a str,
    pub age: u32,
    pub hypertension: u8,
    pub heart_disease: u8,
    pub smoking_history: &'a str,
    pub bmi: f64,
    #[serde(rename = "HbA1c_level")]
    pub hba1c_level: f64,
    pub blood_glucose_level: f64,
}

impl<'a> From<&'a DiabetesAssessmentInput> for PredictionRequest<'a> {
    fn from(input: &'a DiabetesAssessmentInput) -> Self {
        Self {
            gender: input.gender.as_str(),
            age: input.age,
            hypertension: u8::from(input.hypertension),
            heart_disease: u8::from(input.heart_disease),
            smoking_history: input.smoking_history.as_str(),
            bmi: input.bmi,
            hba1c_level: input.hba1c_level,
            blood_glucose_level: input.blood_glucose_level,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PredictionResponse {
    pub probability: f64,
    #[serde(default)]
    pub explanation: Option<Vec<String>>,
}

impl PredictionResponse {
    pub fn into_prediction(self) -> HealthResult<Prediction> {
        if !self.probability.is_finite() || !(0.0..=100.0).contains(&self.probability) {
            return Err(HealthError::Service(format!(
                "probability {} is outside 0-100",
                self.probability
            )));
        }

        Ok(Prediction {
            probability: self.probability,
            explanation: self.explanation.unwrap_or_default(),
        })
    }
}
