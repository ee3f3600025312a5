pub mod assessment;
pub mod form;

pub use assessment::{RiskAssessmentWorkflow, WorkflowState};
pub use form::{AssessmentField, AssessmentForm};
