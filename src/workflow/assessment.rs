use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::anyhow;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::{
    coordinator::HealthCoordinator,
    error::{HealthError, HealthResult},
    models::{DiabetesAssessmentInput, TestResult},
    prediction::Predictor,
};

use super::form::{AssessmentField, AssessmentForm};

/// A failed submission goes straight back to `Editing`; the failure is
/// returned to the caller and kept in [`RiskAssessmentWorkflow::last_notice`].
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum WorkflowState {
    #[default]
    Editing,
    Validating,
    Submitting,
    Succeeded,
}

#[derive(Default)]
struct WorkflowInner {
    form: AssessmentForm,
    state: WorkflowState,
    notice: Option<String>,
}

type SharedInner = Arc<Mutex<WorkflowInner>>;

fn lock(inner: &Mutex<WorkflowInner>) -> MutexGuard<'_, WorkflowInner> {
    match inner.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Records how a submission ended and hands the outcome back.
fn settle(inner: &Mutex<WorkflowInner>, outcome: HealthResult<TestResult>) -> HealthResult<TestResult> {
    let mut inner = lock(inner);
    match outcome {
        Ok(result) => {
            inner.state = WorkflowState::Succeeded;
            inner.notice = None;
            Ok(result)
        }
        Err(err) => {
            warn!("Risk assessment submission failed: {err}");
            inner.state = WorkflowState::Editing;
            inner.notice = Some(err.user_notice());
            Err(err)
        }
    }
}

/// One diabetes risk assessment, from form entry to stored result.
pub struct RiskAssessmentWorkflow {
    coordinator: Arc<HealthCoordinator>,
    predictor: Arc<dyn Predictor>,
    inner: SharedInner,
    dismissed: CancellationToken,
}

/// Puts the workflow back into `Editing` if a submission future is dropped
/// while the prediction is still outstanding. Disarmed once the outcome is
/// settled or handed to the commit task.
struct InFlight<'a> {
    inner: &'a Mutex<WorkflowInner>,
    armed: bool,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.armed {
            let mut inner = lock(self.inner);
            if inner.state == WorkflowState::Submitting {
                debug!("Submission abandoned before the prediction arrived");
                inner.state = WorkflowState::Editing;
            }
        }
    }
}

impl RiskAssessmentWorkflow {
    pub fn new(coordinator: Arc<HealthCoordinator>, predictor: Arc<dyn Predictor>) -> Self {
        Self {
            coordinator,
            predictor,
            inner: Arc::new(Mutex::new(WorkflowInner::default())),
            dismissed: CancellationToken::new(),
        }
    }

    pub fn state(&self) -> WorkflowState {
        lock(&self.inner).state
    }

    pub fn form(&self) -> AssessmentForm {
        lock(&self.inner).form.clone()
    }

    /// User-facing text for the most recent failed submission.
    pub fn last_notice(&self) -> Option<String> {
        lock(&self.inner).notice.clone()
    }

    /// Whether the submit control should be enabled.
    pub fn can_submit(&self) -> bool {
        !self.dismissed.is_cancelled() && self.state() == WorkflowState::Editing
    }

    pub fn set_field(&self, field: AssessmentField, value: impl Into<String>) -> HealthResult<()> {
        let mut inner = lock(&self.inner);
        match inner.state {
            WorkflowState::Editing => {
                inner.form.set(field, value);
                Ok(())
            }
            WorkflowState::Succeeded => Err(HealthError::AlreadySubmitted),
            WorkflowState::Validating | WorkflowState::Submitting => {
                Err(HealthError::SubmissionInFlight)
            }
        }
    }

    /// The presenting screen is gone. A prediction that arrives afterwards
    /// is dropped instead of stored.
    pub fn dismiss(&self) {
        self.dismissed.cancel();
    }

    pub fn is_dismissed(&self) -> bool {
        self.dismissed.is_cancelled()
    }

    /// Dropping this future before the prediction arrives abandons the
    /// submission. Once a prediction has been accepted, storing it finishes
    /// regardless and the workflow stays `Submitting` until it has.
    pub async fn submit(&self) -> HealthResult<TestResult> {
        if self.dismissed.is_cancelled() {
            return Err(HealthError::Dismissed);
        }

        let input = self.begin_submission()?;
        let mut guard = InFlight {
            inner: &self.inner,
            armed: true,
        };

        let prediction = match self.predictor.predict(&input).await {
            Ok(prediction) => prediction,
            Err(err) => {
                guard.armed = false;
                return settle(&self.inner, Err(err));
            }
        };

        if self.dismissed.is_cancelled() {
            info!("Discarding prediction for a dismissed assessment");
            guard.armed = false;
            return settle(&self.inner, Err(HealthError::Dismissed));
        }

        let result = TestResult::diabetes(
            prediction.probability,
            prediction.explanation,
            self.coordinator.clock().now(),
        );
        let commit = tokio::spawn(commit_result(
            self.coordinator.clone(),
            self.inner.clone(),
            result,
        ));
        guard.armed = false;

        match commit.await {
            Ok(outcome) => outcome,
            Err(err) => settle(
                &self.inner,
                Err(HealthError::Storage(anyhow!("storing the result did not finish: {err}"))),
            ),
        }
    }

    fn begin_submission(&self) -> HealthResult<DiabetesAssessmentInput> {
        let mut inner = lock(&self.inner);
        match inner.state {
            WorkflowState::Editing => {}
            WorkflowState::Succeeded => return Err(HealthError::AlreadySubmitted),
            WorkflowState::Validating | WorkflowState::Submitting => {
                return Err(HealthError::SubmissionInFlight)
            }
        }

        inner.state = WorkflowState::Validating;
        match inner.form.validate() {
            Ok(input) => {
                debug!("Assessment form valid; submitting");
                inner.state = WorkflowState::Submitting;
                inner.notice = None;
                Ok(input)
            }
            Err(errors) => {
                let err = HealthError::Validation(errors);
                inner.state = WorkflowState::Editing;
                inner.notice = Some(err.user_notice());
                Err(err)
            }
        }
    }
}

async fn commit_result(
    coordinator: Arc<HealthCoordinator>,
    inner: SharedInner,
    result: TestResult,
) -> HealthResult<TestResult> {
    let outcome = coordinator
        .append_result(result.clone())
        .await
        .map(|_| result);
    settle(&inner, outcome)
}

#[cfg(test)]
mod tests {
    use std::{
        sync::atomic::{AtomicUsize, Ordering},
        time::Duration,
    };

    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use tokio::sync::Notify;

    use super::*;
    use crate::{
        clock::FixedClock,
        db::{KeyValueStore, MemoryStore, SlowWriteStore},
        error::GENERIC_FAILURE_NOTICE,
        prediction::Prediction,
        store::RecordStore,
    };

    enum Reply {
        Prediction(f64, Vec<String>),
        NetworkDown,
    }

    struct FakePredictor {
        reply: Reply,
        calls: AtomicUsize,
        entered: Notify,
        release: Option<Notify>,
    }

    impl FakePredictor {
        fn new(reply: Reply) -> Self {
            Self {
                reply,
                calls: AtomicUsize::new(0),
                entered: Notify::new(),
                release: None,
            }
        }

        fn gated(reply: Reply) -> Self {
            Self {
                release: Some(Notify::new()),
                ..Self::new(reply)
            }
        }
    }

    #[async_trait]
    impl Predictor for FakePredictor {
        async fn predict(&self, _input: &DiabetesAssessmentInput) -> HealthResult<Prediction> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.entered.notify_one();
            if let Some(release) = &self.release {
                release.notified().await;
            }
            match &self.reply {
                Reply::Prediction(probability, explanation) => Ok(Prediction {
                    probability: *probability,
                    explanation: explanation.clone(),
                }),
                Reply::NetworkDown => Err(HealthError::Network("connection refused".into())),
            }
        }
    }

    async fn setup_over<S>(
        kv: Arc<S>,
        predictor: Arc<FakePredictor>,
    ) -> (Arc<HealthCoordinator>, RiskAssessmentWorkflow)
    where
        S: KeyValueStore + 'static,
    {
        let clock = FixedClock(Utc.with_ymd_and_hms(2024, 7, 4, 12, 0, 0).unwrap());
        let coordinator =
            Arc::new(HealthCoordinator::load(RecordStore::new(kv), Arc::new(clock)).await);
        let workflow = RiskAssessmentWorkflow::new(coordinator.clone(), predictor);
        (coordinator, workflow)
    }

    async fn setup(predictor: Arc<FakePredictor>) -> (Arc<MemoryStore>, Arc<HealthCoordinator>, RiskAssessmentWorkflow) {
        let kv = Arc::new(MemoryStore::new());
        let (coordinator, workflow) = setup_over(kv.clone(), predictor).await;
        (kv, coordinator, workflow)
    }

    fn fill(workflow: &RiskAssessmentWorkflow) {
        let values = [
            (AssessmentField::Gender, "Female"),
            (AssessmentField::Age, "61"),
            (AssessmentField::Hypertension, "1"),
            (AssessmentField::HeartDisease, "0"),
            (AssessmentField::SmokingHistory, "never"),
            (AssessmentField::Bmi, "31.2"),
            (AssessmentField::Hba1cLevel, "7.1"),
            (AssessmentField::BloodGlucoseLevel, "190"),
        ];
        for (field, value) in values {
            workflow.set_field(field, value).unwrap();
        }
    }

    #[tokio::test]
    async fn successful_prediction_is_stored_and_published() {
        let explanation = vec!["High HbA1c".to_string(), "Elevated glucose".to_string()];
        let predictor = Arc::new(FakePredictor::new(Reply::Prediction(72.5, explanation.clone())));
        let (_, coordinator, workflow) = setup(predictor).await;
        fill(&workflow);

        let result = workflow.submit().await.unwrap();

        assert!(result.result.message.contains("72.5"));
        assert_eq!(result.result.probability, 72.5);
        assert_eq!(result.explanation, explanation);
        assert_eq!(result.test_name, "Diabetes");
        assert_eq!(result.date, coordinator.clock().now());
        assert_eq!(coordinator.results().await, vec![result]);
        assert_eq!(coordinator.version(), 1);
        assert_eq!(workflow.state(), WorkflowState::Succeeded);

        assert!(matches!(workflow.submit().await, Err(HealthError::AlreadySubmitted)));
    }

    #[tokio::test]
    async fn network_failure_keeps_input_and_log() {
        let predictor = Arc::new(FakePredictor::new(Reply::NetworkDown));
        let (_, coordinator, workflow) = setup(predictor).await;
        fill(&workflow);
        let before = workflow.form();

        let err = workflow.submit().await.unwrap_err();

        assert!(matches!(err, HealthError::Network(_)));
        assert_eq!(workflow.state(), WorkflowState::Editing);
        assert_eq!(workflow.form(), before);
        assert_eq!(workflow.last_notice().as_deref(), Some(GENERIC_FAILURE_NOTICE));
        assert!(coordinator.results().await.is_empty());
        assert!(coordinator.store().load_test_results().await.is_empty());
        assert!(workflow.can_submit());
    }

    #[tokio::test]
    async fn missing_fields_never_reach_the_predictor() {
        let predictor = Arc::new(FakePredictor::new(Reply::Prediction(10.0, vec![])));
        let (_, _, workflow) = setup(predictor.clone()).await;
        workflow.set_field(AssessmentField::Gender, "Male").unwrap();
        workflow.set_field(AssessmentField::Age, "30").unwrap();

        match workflow.submit().await {
            Err(HealthError::Validation(errors)) => assert_eq!(errors.missing.len(), 6),
            other => panic!("expected validation failure, got {other:?}"),
        }
        assert_eq!(predictor.calls.load(Ordering::SeqCst), 0);
        assert_eq!(workflow.state(), WorkflowState::Editing);
    }

    #[tokio::test]
    async fn storage_failure_returns_to_editing() {
        let predictor = Arc::new(FakePredictor::new(Reply::Prediction(40.0, vec![])));
        let (kv, coordinator, workflow) = setup(predictor).await;
        fill(&workflow);
        kv.set_fail_writes(true);

        assert!(matches!(workflow.submit().await, Err(HealthError::Storage(_))));
        assert_eq!(workflow.state(), WorkflowState::Editing);
        assert!(coordinator.results().await.is_empty());
    }

    #[tokio::test]
    async fn second_submit_while_in_flight_is_rejected() {
        let predictor = Arc::new(FakePredictor::gated(Reply::Prediction(20.0, vec![])));
        let (_, coordinator, workflow) = setup(predictor.clone()).await;
        fill(&workflow);

        let (first, second) = tokio::join!(workflow.submit(), async {
            predictor.entered.notified().await;
            assert!(!workflow.can_submit());
            let edit = workflow.set_field(AssessmentField::Age, "62");
            let retry = workflow.submit().await;
            if let Some(release) = &predictor.release {
                release.notify_one();
            }
            (edit, retry)
        });

        assert!(first.is_ok());
        assert!(matches!(second.0, Err(HealthError::SubmissionInFlight)));
        assert!(matches!(second.1, Err(HealthError::SubmissionInFlight)));
        assert_eq!(predictor.calls.load(Ordering::SeqCst), 1);
        assert_eq!(coordinator.results().await.len(), 1);
    }

    #[tokio::test]
    async fn late_prediction_after_dismiss_is_discarded() {
        let predictor = Arc::new(FakePredictor::gated(Reply::Prediction(55.0, vec![])));
        let (_, coordinator, workflow) = setup(predictor.clone()).await;
        fill(&workflow);

        let (outcome, _) = tokio::join!(workflow.submit(), async {
            predictor.entered.notified().await;
            workflow.dismiss();
            if let Some(release) = &predictor.release {
                release.notify_one();
            }
        });

        assert!(matches!(outcome, Err(HealthError::Dismissed)));
        assert!(coordinator.results().await.is_empty());
        assert_eq!(coordinator.version(), 0);
        assert!(!workflow.can_submit());
    }

    #[tokio::test]
    async fn abandoning_before_the_prediction_returns_to_editing() {
        let predictor = Arc::new(FakePredictor::gated(Reply::Prediction(30.0, vec![])));
        let (_, coordinator, workflow) = setup(predictor.clone()).await;
        fill(&workflow);

        let abandoned = tokio::time::timeout(Duration::from_millis(20), workflow.submit()).await;

        assert!(abandoned.is_err());
        assert_eq!(workflow.state(), WorkflowState::Editing);
        assert!(workflow.can_submit());
        assert!(coordinator.results().await.is_empty());
        assert_eq!(coordinator.version(), 0);
    }

    #[tokio::test]
    async fn abandoning_while_storing_keeps_one_result() {
        let kv = Arc::new(SlowWriteStore::default());
        let predictor = Arc::new(FakePredictor::new(Reply::Prediction(50.0, vec![])));
        let (coordinator, workflow) = setup_over(kv.clone(), predictor.clone()).await;
        fill(&workflow);

        let abandoned = tokio::time::timeout(Duration::from_millis(20), workflow.submit()).await;
        assert!(abandoned.is_err());
        assert_eq!(workflow.state(), WorkflowState::Submitting);
        assert!(matches!(workflow.submit().await, Err(HealthError::SubmissionInFlight)));

        kv.release.notify_one();
        tokio::time::timeout(Duration::from_secs(2), async {
            while workflow.state() == WorkflowState::Submitting {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();

        assert_eq!(workflow.state(), WorkflowState::Succeeded);
        assert!(matches!(workflow.submit().await, Err(HealthError::AlreadySubmitted)));
        assert_eq!(predictor.calls.load(Ordering::SeqCst), 1);

        let persisted = coordinator.store().load_test_results().await;
        assert_eq!(persisted.len(), 1);
        assert_eq!(coordinator.results().await, persisted);
        assert_eq!(coordinator.version(), 1);
    }

    #[test]
    fn fresh_workflow_state_is_editing() {
        assert_eq!(WorkflowState::default(), WorkflowState::Editing);
        assert_eq!(serde_json::to_value(WorkflowState::Succeeded).unwrap(), "succeeded");
    }
}
