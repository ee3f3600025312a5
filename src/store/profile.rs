use std::sync::Arc;

use log::error;

use crate::{
    db::KeyValueStore,
    error::{HealthError, HealthResult},
    models::UserProfile,
};

use super::{read_json, write_json, USER_DATA_KEY};

#[derive(Clone)]
pub struct ProfileStore {
    kv: Arc<dyn KeyValueStore>,
}

impl ProfileStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    pub async fn load(&self) -> Option<UserProfile> {
        match read_json(self.kv.as_ref(), USER_DATA_KEY).await {
            Ok(profile) => profile,
            Err(err) => {
                error!("Failed to load user profile: {err:#}");
                None
            }
        }
    }

    pub async fn save(&self, profile: &UserProfile) -> HealthResult<()> {
        write_json(self.kv.as_ref(), USER_DATA_KEY, profile).await
    }

    /// Change name and email, keeping any other stored profile fields. A
    /// stored profile that cannot be decoded is left alone.
    pub async fn update(&self, name: &str, email: &str) -> HealthResult<UserProfile> {
        let mut profile = read_json::<UserProfile>(self.kv.as_ref(), USER_DATA_KEY)
            .await
            .map_err(HealthError::Storage)?
            .unwrap_or_default();
        profile.name = name.trim().to_string();
        profile.email = email.trim().to_string();
        self.save(&profile).await?;
        Ok(profile)
    }
}
