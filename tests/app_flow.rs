use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use healthtrack::{
    models::{DiabetesAssessmentInput, VitalMetric},
    vitals::VitalsForm,
    AppConfig, AssessmentField, ChangeReason, Database, FixedClock, HealthApp, HealthError,
    HealthResult, Prediction, Predictor, WorkflowState,
};
use tempfile::TempDir;

struct ScriptedPredictor {
    probability: f64,
    calls: AtomicUsize,
}

#[async_trait]
impl Predictor for ScriptedPredictor {
    async fn predict(&self, input: &DiabetesAssessmentInput) -> HealthResult<Prediction> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Prediction {
            probability: self.probability,
            explanation: vec![format!("HbA1c {}", input.hba1c_level)],
        })
    }
}

fn config(dir: &TempDir) -> AppConfig {
    AppConfig {
        data_dir: dir.path().to_path_buf(),
        ..AppConfig::default()
    }
}

async fn open_app(dir: &TempDir, predictor: Arc<ScriptedPredictor>) -> HealthApp {
    let config = config(dir);
    let database = Database::new(config.database_path()).unwrap();
    let clock = FixedClock(Utc.with_ymd_and_hms(2024, 3, 18, 9, 30, 0).unwrap());
    HealthApp::with_parts(config, Arc::new(database), predictor, Arc::new(clock)).await
}

fn predictor(probability: f64) -> Arc<ScriptedPredictor> {
    Arc::new(ScriptedPredictor {
        probability,
        calls: AtomicUsize::new(0),
    })
}

fn vitals_form() -> VitalsForm {
    VitalsForm {
        heart_rate: "72".into(),
        systolic: "120".into(),
        diastolic: "80".into(),
        respiratory_rate: "16".into(),
        weight: "70.5".into(),
        temperature: "36.8".into(),
    }
}

async fn run_assessment(app: &HealthApp) -> HealthResult<healthtrack::models::TestResult> {
    let workflow = app.start_assessment();
    let values = [
        (AssessmentField::Gender, "Female"),
        (AssessmentField::Age, "52"),
        (AssessmentField::Hypertension, "0"),
        (AssessmentField::HeartDisease, "0"),
        (AssessmentField::SmokingHistory, "never"),
        (AssessmentField::Bmi, "27.3"),
        (AssessmentField::Hba1cLevel, "6.8"),
        (AssessmentField::BloodGlucoseLevel, "160"),
    ];
    for (field, value) in values {
        workflow.set_field(field, value)?;
    }
    let result = workflow.submit().await;
    if result.is_ok() {
        assert_eq!(workflow.state(), WorkflowState::Succeeded);
    }
    result
}

#[tokio::test]
async fn assessment_result_reaches_every_subscriber_and_survives_restart() {
    let dir = TempDir::new().unwrap();
    let app = open_app(&dir, predictor(72.5)).await;

    let dashboard = Arc::new(Mutex::new(Vec::new()));
    let results_screen = Arc::new(AtomicUsize::new(0));
    let coordinator = app.coordinator();
    let _dashboard_sub = {
        let seen = dashboard.clone();
        coordinator.subscribe(move |event| seen.lock().unwrap().push(*event))
    };
    let _results_sub = {
        let count = results_screen.clone();
        coordinator.subscribe(move |_| {
            count.fetch_add(1, Ordering::SeqCst);
        })
    };

    let result = run_assessment(&app).await.unwrap();
    assert_eq!(result.result.message, "Probability of diabetes: 72.5%");

    let events = dashboard.lock().unwrap().clone();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].version, 1);
    assert_eq!(events[0].reason, ChangeReason::ResultAppended(result.id));
    assert_eq!(results_screen.load(Ordering::SeqCst), 1);
    assert_eq!(coordinator.results().await, vec![result.clone()]);

    drop(app);
    let reopened = open_app(&dir, predictor(10.0)).await;
    assert_eq!(reopened.coordinator().results().await, vec![result]);
    assert_eq!(reopened.coordinator().version(), 0);
}

#[tokio::test]
async fn saving_vitals_notifies_dependents() {
    let dir = TempDir::new().unwrap();
    let app = open_app(&dir, predictor(5.0)).await;
    let refreshes = Arc::new(AtomicUsize::new(0));
    let _sub = {
        let count = refreshes.clone();
        app.coordinator().subscribe(move |event| {
            if event.reason == ChangeReason::Refreshed {
                count.fetch_add(1, Ordering::SeqCst);
            }
        })
    };

    let saved = app.submit_vitals(&vitals_form()).await.unwrap();
    assert_eq!(app.records().load_vitals().await, Some(saved));

    let edited = app.edit_metric(VitalMetric::HeartRate, "88").await.unwrap();
    assert_eq!(edited.heart_rate, 88);
    assert_eq!(edited.blood_pressure, saved.blood_pressure);
    assert_eq!(refreshes.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn incomplete_vitals_are_rejected_without_writing() {
    let dir = TempDir::new().unwrap();
    let app = open_app(&dir, predictor(5.0)).await;
    let mut form = vitals_form();
    form.weight.clear();

    match app.submit_vitals(&form).await {
        Err(HealthError::Validation(errors)) => assert_eq!(errors.missing, vec!["weight"]),
        other => panic!("expected validation failure, got {other:?}"),
    }
    assert_eq!(app.records().load_vitals().await, None);
    assert_eq!(app.coordinator().version(), 0);
}

#[tokio::test]
async fn deleting_by_id_keeps_other_results_in_order() {
    let dir = TempDir::new().unwrap();
    let app = open_app(&dir, predictor(33.0)).await;
    let first = run_assessment(&app).await.unwrap();
    let second = run_assessment(&app).await.unwrap();
    let third = run_assessment(&app).await.unwrap();

    let removed = app.coordinator().delete_result(second.id).await.unwrap();
    assert_eq!(removed, second);

    let remaining = app.records().load_test_results().await;
    assert_eq!(remaining, vec![first, third]);
    assert_eq!(app.coordinator().results().await, remaining);
}

#[tokio::test]
async fn logout_clears_every_local_record() {
    let dir = TempDir::new().unwrap();
    let app = open_app(&dir, predictor(61.0)).await;

    app.submit_vitals(&vitals_form()).await.unwrap();
    run_assessment(&app).await.unwrap();
    app.profile().update("Ada Lovelace", "ada@example.com").await.unwrap();
    let notifications = app.notifications().load().await;
    assert_eq!(notifications.len(), 3);
    app.notifications().mark_all_read().await.unwrap();

    app.logout().await.unwrap();

    assert!(app.coordinator().results().await.is_empty());
    assert!(app.records().load_test_results().await.is_empty());
    assert_eq!(app.records().load_vitals().await, None);
    assert_eq!(app.profile().load().await, None);
    // Cleared notifications are reseeded unread.
    assert!(app
        .notifications()
        .load()
        .await
        .iter()
        .all(|notification| !notification.read));
}
