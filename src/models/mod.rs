pub mod assessment;
pub mod notification;
pub mod profile;
pub mod test_result;
pub mod vitals;

pub use assessment::{DiabetesAssessmentInput, Gender, SmokingHistory};
pub use notification::{Notification, NotificationFilter};
pub use profile::UserProfile;
pub use test_result::{ResultPayload, TestResult, DIABETES_TEST_NAME};
pub use vitals::{BloodPressure, VitalMetric, VitalsSnapshot};
