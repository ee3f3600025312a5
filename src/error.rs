use std::fmt;

use thiserror::Error;
use uuid::Uuid;

/// Shown for every submission failure the user can only retry.
pub const GENERIC_FAILURE_NOTICE: &str =
    "There was an error submitting your test. Please try again.";

/// Field names that failed form validation, grouped by why they failed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors {
    pub missing: Vec<String>,
    pub invalid: Vec<String>,
}

impl FieldErrors {
    pub fn missing(fields: Vec<String>) -> Self {
        Self {
            missing: fields,
            invalid: Vec::new(),
        }
    }

    pub fn invalid(fields: Vec<String>) -> Self {
        Self {
            missing: Vec::new(),
            invalid: fields,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.missing.is_empty() && self.invalid.is_empty()
    }

    /// One human-readable line per offending field, missing fields first.
    pub fn messages(&self) -> Vec<String> {
        self.missing
            .iter()
            .map(|field| format!("{} is required", display_name(field)))
            .chain(
                self.invalid
                    .iter()
                    .map(|field| format!("{} is invalid", display_name(field))),
            )
            .collect()
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.messages().join("\n"))
    }
}

fn display_name(field: &str) -> String {
    field.replace('_', " ")
}

#[derive(Debug, Error)]
pub enum HealthError {
    #[error("validation failed:\n{0}")]
    Validation(FieldErrors),

    #[error("network failure: {0}")]
    Network(String),

    #[error("prediction service failure: {0}")]
    Service(String),

    #[error("storage failure: {0:#}")]
    Storage(anyhow::Error),

    #[error("no test result at index {index} (log holds {len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("test result {0} not found")]
    ResultNotFound(Uuid),

    #[error("a submission is already in flight")]
    SubmissionInFlight,

    #[error("this assessment has already been submitted")]
    AlreadySubmitted,

    #[error("the assessment screen was dismissed before the prediction returned")]
    Dismissed,

    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type HealthResult<T> = Result<T, HealthError>;

impl HealthError {
    /// Text a screen can put in an alert without inspecting the variant.
    pub fn user_notice(&self) -> String {
        match self {
            HealthError::Validation(errors) => errors.to_string(),
            HealthError::Network(_) | HealthError::Service(_) | HealthError::Storage(_) => {
                GENERIC_FAILURE_NOTICE.to_string()
            }
            other => other.to_string(),
        }
    }

    /// Whether trying the same action again may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            HealthError::Network(_) | HealthError::Service(_) | HealthError::Storage(_)
        )
    }
}

impl From<FieldErrors> for HealthError {
    fn from(errors: FieldErrors) -> Self {
        HealthError::Validation(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_errors_list_missing_before_invalid() {
        let errors = FieldErrors {
            missing: vec!["heart_disease".into(), "HbA1c_level".into()],
            invalid: vec!["age".into()],
        };

        assert_eq!(
            errors.to_string(),
            "heart disease is required\nHbA1c level is required\nage is invalid"
        );
    }

    #[test]
    fn transport_failures_share_the_generic_notice() {
        let network = HealthError::Network("timed out".into());
        let service = HealthError::Service("500".into());

        assert_eq!(network.user_notice(), GENERIC_FAILURE_NOTICE);
        assert_eq!(service.user_notice(), GENERIC_FAILURE_NOTICE);
        assert!(network.is_retryable());
        assert!(!HealthError::IndexOutOfRange { index: 3, len: 1 }.is_retryable());
    }
}
