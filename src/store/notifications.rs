use std::sync::Arc;

use log::{error, warn};

use crate::{
    db::KeyValueStore,
    error::{HealthError, HealthResult},
    models::{notification::default_notifications, Notification},
};

use super::{read_json, write_json, NOTIFICATIONS_KEY};

#[derive(Clone)]
pub struct NotificationStore {
    kv: Arc<dyn KeyValueStore>,
}

impl NotificationStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    /// Seeds and persists the default notifications the first time; a stored
    /// value that cannot be decoded reads as an empty list.
    pub async fn load(&self) -> Vec<Notification> {
        match read_json::<Vec<Notification>>(self.kv.as_ref(), NOTIFICATIONS_KEY).await {
            Ok(Some(notifications)) => notifications,
            Ok(None) => {
                let defaults = default_notifications();
                if let Err(err) = write_json(self.kv.as_ref(), NOTIFICATIONS_KEY, &defaults).await {
                    warn!("Failed to persist default notifications: {err}");
                }
                defaults
            }
            Err(err) => {
                error!("Failed to load notifications: {err:#}");
                Vec::new()
            }
        }
    }

    pub async fn mark_read(&self, id: i64) -> HealthResult<Vec<Notification>> {
        self.rewrite(|notifications| {
            for notification in notifications.iter_mut().filter(|n| n.id == id) {
                notification.read = true;
            }
        })
        .await
    }

    pub async fn mark_all_read(&self) -> HealthResult<Vec<Notification>> {
        self.rewrite(|notifications| {
            for notification in notifications.iter_mut() {
                notification.read = true;
            }
        })
        .await
    }

    pub async fn dismiss(&self, id: i64) -> HealthResult<Vec<Notification>> {
        self.rewrite(|notifications| notifications.retain(|n| n.id != id))
            .await
    }

    async fn rewrite<F>(&self, edit: F) -> HealthResult<Vec<Notification>>
    where
        F: FnOnce(&mut Vec<Notification>) + Send,
    {
        let stored = read_json::<Vec<Notification>>(self.kv.as_ref(), NOTIFICATIONS_KEY)
            .await
            .map_err(HealthError::Storage)?;
        let mut notifications = stored.unwrap_or_else(default_notifications);
        edit(&mut notifications);
        write_json(self.kv.as_ref(), NOTIFICATIONS_KEY, &notifications).await?;
        Ok(notifications)
    }
}
