pub mod clock;
pub mod config;
pub mod coordinator;
pub mod db;
pub mod error;
pub mod models;
pub mod prediction;
pub mod store;
pub mod vitals;
pub mod workflow;

use std::sync::Arc;

use anyhow::Context;
use log::info;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::AppConfig;
pub use coordinator::{ChangeEvent, ChangeReason, HealthCoordinator, Subscription};
pub use db::{Database, KeyValueStore, MemoryStore};
pub use error::{FieldErrors, HealthError, HealthResult};
pub use prediction::{Prediction, PredictionClient, Predictor};
pub use store::{NotificationStore, ProfileStore, RecordStore};
pub use workflow::{AssessmentField, RiskAssessmentWorkflow, WorkflowState};

use models::{VitalMetric, VitalsSnapshot};
use vitals::VitalsForm;

/// Set up `env_logger`; `RUST_LOG` overrides the `info` default. Safe to call
/// more than once.
pub fn init_logging() {
    let _ = env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .try_init();
}

/// Everything the screens need, wired together once per process.
pub struct HealthApp {
    config: AppConfig,
    records: RecordStore,
    coordinator: Arc<HealthCoordinator>,
    predictor: Arc<dyn Predictor>,
    notifications: NotificationStore,
    profile: ProfileStore,
}

impl HealthApp {
    /// Open SQLite storage under the configured data directory and talk to
    /// the configured prediction service.
    pub async fn open(config: AppConfig) -> anyhow::Result<Self> {
        std::fs::create_dir_all(&config.data_dir).with_context(|| {
            format!("failed to create data directory {}", config.data_dir.display())
        })?;

        let database = Database::new(config.database_path())?;
        let predictor = PredictionClient::from_config(&config)?;
        info!("Prediction endpoint: {}", predictor.endpoint());

        Ok(Self::with_parts(
            config,
            Arc::new(database),
            Arc::new(predictor),
            Arc::new(SystemClock),
        )
        .await)
    }

    pub async fn with_parts(
        config: AppConfig,
        kv: Arc<dyn KeyValueStore>,
        predictor: Arc<dyn Predictor>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let records = RecordStore::new(kv.clone());
        let coordinator = Arc::new(HealthCoordinator::load(records.clone(), clock).await);

        Self {
            config,
            records,
            coordinator,
            predictor,
            notifications: NotificationStore::new(kv.clone()),
            profile: ProfileStore::new(kv),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn records(&self) -> &RecordStore {
        &self.records
    }

    pub fn coordinator(&self) -> Arc<HealthCoordinator> {
        self.coordinator.clone()
    }

    pub fn notifications(&self) -> &NotificationStore {
        &self.notifications
    }

    pub fn profile(&self) -> &ProfileStore {
        &self.profile
    }

    /// A fresh workflow for one visit to the assessment screen.
    pub fn start_assessment(&self) -> RiskAssessmentWorkflow {
        RiskAssessmentWorkflow::new(self.coordinator.clone(), self.predictor.clone())
    }

    /// Save the "add health data" form and let dependents reload vitals.
    pub async fn submit_vitals(&self, form: &VitalsForm) -> HealthResult<VitalsSnapshot> {
        let snapshot = form.parse()?;
        self.records.save_vitals(&snapshot).await?;
        self.coordinator.trigger_refresh();
        info!("Vitals snapshot saved");
        Ok(snapshot)
    }

    pub async fn edit_metric(&self, metric: VitalMetric, raw: &str) -> HealthResult<VitalsSnapshot> {
        let snapshot = self.records.update_metric(metric, raw).await?;
        self.coordinator.trigger_refresh();
        Ok(snapshot)
    }

    /// Wipe all local data and reset shared state.
    pub async fn logout(&self) -> HealthResult<()> {
        self.coordinator.reset_after_wipe().await?;
        info!("Logged out; local data cleared");
        Ok(())
    }
}
