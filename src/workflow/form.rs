use serde::{Deserialize, Serialize};

use crate::{
    error::FieldErrors,
    models::{DiabetesAssessmentInput, Gender, SmokingHistory},
    vitals::form::{parse_positive, parse_whole},
};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AssessmentField {
    Gender,
    Age,
    Hypertension,
    HeartDisease,
    SmokingHistory,
    Bmi,
    #[serde(rename = "HbA1c_level")]
    Hba1cLevel,
    BloodGlucoseLevel,
}

impl AssessmentField {
    /// Form order.
    pub const ALL: [AssessmentField; 8] = [
        AssessmentField::Gender,
        AssessmentField::Age,
        AssessmentField::Hypertension,
        AssessmentField::HeartDisease,
        AssessmentField::SmokingHistory,
        AssessmentField::Bmi,
        AssessmentField::Hba1cLevel,
        AssessmentField::BloodGlucoseLevel,
    ];

    /// Same names the prediction service uses.
    pub fn name(&self) -> &'static str {
        match self {
            AssessmentField::Gender => "gender",
            AssessmentField::Age => "age",
            AssessmentField::Hypertension => "hypertension",
            AssessmentField::HeartDisease => "heart_disease",
            AssessmentField::SmokingHistory => "smoking_history",
            AssessmentField::Bmi => "bmi",
            AssessmentField::Hba1cLevel => "HbA1c_level",
            AssessmentField::BloodGlucoseLevel => "blood_glucose_level",
        }
    }
}

/// The diabetes questionnaire as typed, one string per field.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AssessmentForm {
    pub gender: String,
    pub age: String,
    pub hypertension: String,
    pub heart_disease: String,
    pub smoking_history: String,
    pub bmi: String,
    #[serde(rename = "HbA1c_level")]
    pub hba1c_level: String,
    pub blood_glucose_level: String,
}

impl AssessmentForm {
    pub fn get(&self, field: AssessmentField) -> &str {
        match field {
            AssessmentField::Gender => &self.gender,
            AssessmentField::Age => &self.age,
            AssessmentField::Hypertension => &self.hypertension,
            AssessmentField::HeartDisease => &self.heart_disease,
            AssessmentField::SmokingHistory => &self.smoking_history,
            AssessmentField::Bmi => &self.bmi,
            AssessmentField::Hba1cLevel => &self.hba1c_level,
            AssessmentField::BloodGlucoseLevel => &self.blood_glucose_level,
        }
    }

    pub fn set(&mut self, field: AssessmentField, value: impl Into<String>) {
        let slot = match field {
            AssessmentField::Gender => &mut self.gender,
            AssessmentField::Age => &mut self.age,
            AssessmentField::Hypertension => &mut self.hypertension,
            AssessmentField::HeartDisease => &mut self.heart_disease,
            AssessmentField::SmokingHistory => &mut self.smoking_history,
            AssessmentField::Bmi => &mut self.bmi,
            AssessmentField::Hba1cLevel => &mut self.hba1c_level,
            AssessmentField::BloodGlucoseLevel => &mut self.blood_glucose_level,
        };
        *slot = value.into();
    }

    /// Every blank field is reported in one batch. Only a complete form is
    /// then checked for values that do not parse, again as one batch.
    pub fn validate(&self) -> Result<DiabetesAssessmentInput, FieldErrors> {
        let missing: Vec<String> = AssessmentField::ALL
            .iter()
            .filter(|field| self.get(**field).trim().is_empty())
            .map(|field| field.name().to_string())
            .collect();
        if !missing.is_empty() {
            return Err(FieldErrors::missing(missing));
        }

        let gender = Gender::parse(&self.gender);
        let age = parse_whole(&self.age);
        let hypertension = parse_flag(&self.hypertension);
        let heart_disease = parse_flag(&self.heart_disease);
        let smoking_history = SmokingHistory::parse(&self.smoking_history);
        let bmi = parse_positive(&self.bmi);
        let hba1c_level = parse_positive(&self.hba1c_level);
        let blood_glucose_level = parse_positive(&self.blood_glucose_level);

        match (
            gender,
            age,
            hypertension,
            heart_disease,
            smoking_history,
            bmi,
            hba1c_level,
            blood_glucose_level,
        ) {
            (
                Some(gender),
                Some(age),
                Some(hypertension),
                Some(heart_disease),
                Some(smoking_history),
                Some(bmi),
                Some(hba1c_level),
                Some(blood_glucose_level),
            ) => Ok(DiabetesAssessmentInput {
                gender,
                age,
                hypertension,
                heart_disease,
                smoking_history,
                bmi,
                hba1c_level,
                blood_glucose_level,
            }),
            _ => {
                let parsed = [
                    gender.is_some(),
                    age.is_some(),
                    hypertension.is_some(),
                    heart_disease.is_some(),
                    smoking_history.is_some(),
                    bmi.is_some(),
                    hba1c_level.is_some(),
                    blood_glucose_level.is_some(),
                ];
                let invalid = AssessmentField::ALL
                    .iter()
                    .zip(parsed)
                    .filter(|(_, ok)| !ok)
                    .map(|(field, _)| field.name().to_string())
                    .collect();
                Err(FieldErrors::invalid(invalid))
            }
        }
    }
}

/// Yes/no selectors submit "1"/"0".
fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "yes" | "true" => Some(true),
        "0" | "no" | "false" => Some(false),
        _ => None,
    }
}
