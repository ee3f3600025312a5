use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "male" => Some(Gender::Male),
            "female" => Some(Gender::Female),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SmokingHistory {
    Current,
    Former,
    Never,
    Ever,
    #[serde(rename = "not current")]
    NotCurrent,
}

impl SmokingHistory {
    pub fn as_str(&self) -> &'static str {
        match self {
            SmokingHistory::Current => "current",
            SmokingHistory::Former => "former",
            SmokingHistory::Never => "never",
            SmokingHistory::Ever => "ever",
            SmokingHistory::NotCurrent => "not current",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "current" => Some(SmokingHistory::Current),
            "former" => Some(SmokingHistory::Former),
            "never" => Some(SmokingHistory::Never),
            "ever" => Some(SmokingHistory::Ever),
            "not current" | "not_current" => Some(SmokingHistory::NotCurrent),
            _ => None,
        }
    }
}

/// A fully validated diabetes risk questionnaire. Only lives for one
/// submission; the resulting test result is what gets stored.
#[derive(Debug, Clone, PartialEq)]
pub struct DiabetesAssessmentInput {
    pub gender: Gender,
    pub age: u32,
    pub hypertension: bool,
    pub heart_disease: bool,
    pub smoking_history: SmokingHistory,
    pub bmi: f64,
    /// Percent.
    pub hba1c_level: f64,
    /// mg/dL.
    pub blood_glucose_level: f64,
}
