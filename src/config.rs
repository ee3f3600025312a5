use std::{path::PathBuf, time::Duration};

use anyhow::{Context, Result};

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_PREDICT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_PREDICT_RETRIES: u32 = 1;
pub const DEFAULT_DATA_DIR: &str = "./healthtrack-data";

const ENV_API_BASE_URL: &str = "HEALTHTRACK_API_BASE_URL";
const ENV_PREDICT_TIMEOUT_SECS: &str = "HEALTHTRACK_PREDICT_TIMEOUT_SECS";
const ENV_PREDICT_RETRIES: &str = "HEALTHTRACK_PREDICT_RETRIES";
const ENV_DATA_DIR: &str = "HEALTHTRACK_DATA_DIR";

const DATABASE_FILE: &str = "healthtrack.sqlite3";

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// Base URL of the prediction service; `/predict` is appended.
    pub api_base_url: String,
    pub predict_timeout: Duration,
    /// Extra attempts after a network failure; service errors are never retried.
    pub predict_retries: u32,
    pub data_dir: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.into(),
            predict_timeout: DEFAULT_PREDICT_TIMEOUT,
            predict_retries: DEFAULT_PREDICT_RETRIES,
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup(ENV_API_BASE_URL).filter(|value| !value.trim().is_empty()) {
            config.api_base_url = url.trim().to_string();
        }

        if let Some(raw) = lookup(ENV_PREDICT_TIMEOUT_SECS) {
            let secs: u64 = raw
                .trim()
                .parse()
                .with_context(|| format!("{ENV_PREDICT_TIMEOUT_SECS} must be whole seconds, got '{raw}'"))?;
            if secs == 0 {
                anyhow::bail!("{ENV_PREDICT_TIMEOUT_SECS} must be greater than zero");
            }
            config.predict_timeout = Duration::from_secs(secs);
        }

        if let Some(raw) = lookup(ENV_PREDICT_RETRIES) {
            config.predict_retries = raw
                .trim()
                .parse()
                .with_context(|| format!("{ENV_PREDICT_RETRIES} must be a whole number, got '{raw}'"))?;
        }

        if let Some(dir) = lookup(ENV_DATA_DIR).filter(|value| !value.trim().is_empty()) {
            config.data_dir = PathBuf::from(dir);
        }

        Ok(config)
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(DATABASE_FILE)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = AppConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.predict_timeout, Duration::from_secs(30));
        assert_eq!(config.predict_retries, DEFAULT_PREDICT_RETRIES);
    }

    #[test]
    fn environment_overrides_apply() {
        let config = AppConfig::from_lookup(lookup_from(&[
            (ENV_API_BASE_URL, "https://predict.example.org"),
            (ENV_PREDICT_TIMEOUT_SECS, "5"),
            (ENV_PREDICT_RETRIES, "0"),
            (ENV_DATA_DIR, "/tmp/health"),
        ]))
        .unwrap();

        assert_eq!(config.api_base_url, "https://predict.example.org");
        assert_eq!(config.predict_timeout, Duration::from_secs(5));
        assert_eq!(config.predict_retries, 0);
        assert_eq!(config.database_path(), PathBuf::from("/tmp/health/healthtrack.sqlite3"));
    }

    #[test]
    fn rejects_unusable_timeouts() {
        assert!(AppConfig::from_lookup(lookup_from(&[(ENV_PREDICT_TIMEOUT_SECS, "soon")])).is_err());
        assert!(AppConfig::from_lookup(lookup_from(&[(ENV_PREDICT_TIMEOUT_SECS, "0")])).is_err());
        assert!(AppConfig::from_lookup(lookup_from(&[(ENV_PREDICT_RETRIES, "-1")])).is_err());
    }
}
