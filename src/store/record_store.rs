use std::sync::Arc;

use anyhow::Context;
use chrono::{DateTime, Utc};
use log::{error, info, warn};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    db::KeyValueStore,
    error::{HealthError, HealthResult},
    models::{ResultPayload, TestResult, VitalMetric, VitalsSnapshot},
    vitals::apply_metric_edit,
};

use super::{read_json, write_json, HEALTH_DATA_KEY, TEST_RESULTS_KEY};

/// A deleted result together with the log as persisted afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct RemovedResult {
    pub removed: TestResult,
    pub remaining: Vec<TestResult>,
}

/// Shape of a stored result. Entries written before results had ids are
/// given one on the next load.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredTestResult {
    #[serde(default)]
    id: Option<Uuid>,
    test_name: String,
    date: DateTime<Utc>,
    result: ResultPayload,
    #[serde(default)]
    explanation: Option<Vec<String>>,
}

impl StoredTestResult {
    fn into_result(self) -> TestResult {
        TestResult {
            id: self.id.unwrap_or_else(Uuid::new_v4),
            test_name: self.test_name,
            date: self.date,
            result: self.result,
            explanation: self.explanation.unwrap_or_default(),
        }
    }
}

/// Durable home of the vitals snapshot and the test result log.
#[derive(Clone)]
pub struct RecordStore {
    kv: Arc<dyn KeyValueStore>,
}

impl RecordStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    pub fn kv(&self) -> Arc<dyn KeyValueStore> {
        self.kv.clone()
    }

    /// `None` when nothing is stored or the stored value cannot be read.
    pub async fn load_vitals(&self) -> Option<VitalsSnapshot> {
        match read_json(self.kv.as_ref(), HEALTH_DATA_KEY).await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                error!("Failed to load vitals snapshot: {err:#}");
                None
            }
        }
    }

    pub async fn save_vitals(&self, snapshot: &VitalsSnapshot) -> HealthResult<()> {
        write_json(self.kv.as_ref(), HEALTH_DATA_KEY, snapshot).await
    }

    /// Edit one metric of the current snapshot, starting from zeros when
    /// none has been recorded yet.
    pub async fn update_metric(&self, metric: VitalMetric, raw: &str) -> HealthResult<VitalsSnapshot> {
        let current = self.load_vitals().await.unwrap_or_default();
        let updated = apply_metric_edit(current, metric, raw)?;
        self.save_vitals(&updated).await?;
        info!("Updated vital metric {}", metric.as_str());
        Ok(updated)
    }

    /// Empty when nothing is stored or the log cannot be decoded.
    pub async fn load_test_results(&self) -> Vec<TestResult> {
        match self.read_log().await {
            Ok(log) => log,
            Err(err) => {
                error!("Failed to load test results: {err:#}");
                Vec::new()
            }
        }
    }

    /// Returns the log as persisted after the append.
    pub async fn append_test_result(&self, result: &TestResult) -> HealthResult<Vec<TestResult>> {
        let mut log = self.read_log().await.map_err(HealthError::Storage)?;
        log.push(result.clone());
        write_json(self.kv.as_ref(), TEST_RESULTS_KEY, &log).await?;
        Ok(log)
    }

    pub async fn delete_test_result(&self, index: usize) -> HealthResult<RemovedResult> {
        let mut log = self.read_log().await.map_err(HealthError::Storage)?;
        if index >= log.len() {
            return Err(HealthError::IndexOutOfRange {
                index,
                len: log.len(),
            });
        }
        let removed = log.remove(index);
        write_json(self.kv.as_ref(), TEST_RESULTS_KEY, &log).await?;
        Ok(RemovedResult {
            removed,
            remaining: log,
        })
    }

    pub async fn delete_test_result_by_id(&self, id: Uuid) -> HealthResult<RemovedResult> {
        let log = self.read_log().await.map_err(HealthError::Storage)?;
        let index = log
            .iter()
            .position(|result| result.id == id)
            .ok_or(HealthError::ResultNotFound(id))?;
        self.delete_test_result(index).await
    }

    /// Wipe every key the application owns. Used by logout.
    pub async fn clear_all(&self) -> HealthResult<()> {
        self.kv
            .clear()
            .await
            .context("failed to clear local storage")
            .map_err(HealthError::Storage)
    }

    /// Decode errors propagate here so that writers never replace a log
    /// they could not read.
    async fn read_log(&self) -> anyhow::Result<Vec<TestResult>> {
        let Some(stored) =
            read_json::<Vec<StoredTestResult>>(self.kv.as_ref(), TEST_RESULTS_KEY).await?
        else {
            return Ok(Vec::new());
        };

        let legacy = stored.iter().filter(|entry| entry.id.is_none()).count();
        let log: Vec<TestResult> = stored.into_iter().map(StoredTestResult::into_result).collect();

        if legacy > 0 {
            warn!("Assigning ids to {legacy} stored test results");
            if let Err(err) = write_json(self.kv.as_ref(), TEST_RESULTS_KEY, &log).await {
                warn!("Failed to persist migrated test result ids: {err}");
            }
        }

        Ok(log)
    }
}
