use anyhow::Context;
use serde::{de::DeserializeOwned, Serialize};

use crate::{
    db::KeyValueStore,
    error::{HealthError, HealthResult},
};

pub mod notifications;
pub mod profile;
pub mod record_store;

pub use notifications::NotificationStore;
pub use profile::ProfileStore;
pub use record_store::{RecordStore, RemovedResult};

pub const HEALTH_DATA_KEY: &str = "healthData";
pub const TEST_RESULTS_KEY: &str = "testResults";
pub const NOTIFICATIONS_KEY: &str = "notifications";
pub const USER_DATA_KEY: &str = "userData";

/// Every key this application writes.
pub const ALL_KEYS: [&str; 4] = [
    HEALTH_DATA_KEY,
    TEST_RESULTS_KEY,
    NOTIFICATIONS_KEY,
    USER_DATA_KEY,
];

pub(crate) async fn read_json<T: DeserializeOwned>(
    kv: &dyn KeyValueStore,
    key: &str,
) -> anyhow::Result<Option<T>> {
    let Some(raw) = kv.get(key).await? else {
        return Ok(None);
    };
    let value = serde_json::from_str(&raw).with_context(|| format!("failed to decode '{key}'"))?;
    Ok(Some(value))
}

pub(crate) async fn write_json<T: Serialize + ?Sized>(
    kv: &dyn KeyValueStore,
    key: &str,
    value: &T,
) -> HealthResult<()> {
    let serialized = serde_json::to_string(value)
        .with_context(|| format!("failed to encode '{key}'"))
        .map_err(HealthError::Storage)?;
    kv.set(key, serialized)
        .await
        .with_context(|| format!("failed to persist '{key}'"))
        .map_err(HealthError::Storage)
}
