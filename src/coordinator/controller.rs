use std::{
    future::Future,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex as StdMutex, MutexGuard, Weak,
    },
};

use anyhow::anyhow;
use log::{debug, info, warn};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{
    clock::Clock,
    error::{HealthError, HealthResult},
    models::TestResult,
    store::RecordStore,
};

use super::{ChangeEvent, ChangeReason};

pub type Listener = Arc<dyn Fn(&ChangeEvent) + Send + Sync>;

#[derive(Default)]
struct Subscribers {
    next_id: u64,
    listeners: Vec<(u64, Listener)>,
}

fn lock_subscribers(subscribers: &StdMutex<Subscribers>) -> MutexGuard<'_, Subscribers> {
    match subscribers.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Mutations run on their own task: once a write has been handed to storage,
/// the mirror, version and subscribers follow it even if the caller stops
/// waiting.
async fn run_to_completion<T, F>(mutation: F) -> HealthResult<T>
where
    F: Future<Output = HealthResult<T>> + Send + 'static,
    T: Send + 'static,
{
    tokio::spawn(mutation).await.map_err(|err| {
        HealthError::Storage(anyhow!("health state update did not finish: {err}"))
    })?
}

/// Keeps a listener registered. Dropping it unsubscribes.
pub struct Subscription {
    id: u64,
    subscribers: Weak<StdMutex<Subscribers>>,
}

impl Subscription {
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(subscribers) = self.subscribers.upgrade() {
            lock_subscribers(&subscribers)
                .listeners
                .retain(|(id, _)| *id != self.id);
        }
    }
}

/// Shared, observable view of the test result log.
///
/// Every mutation goes to the [`RecordStore`] first; the in-memory log and
/// the version only change once the write has succeeded, so subscribers
/// never observe a result that is not on disk.
pub struct HealthCoordinator {
    store: RecordStore,
    clock: Arc<dyn Clock>,
    log: Mutex<Vec<TestResult>>,
    version: AtomicU64,
    subscribers: Arc<StdMutex<Subscribers>>,
}

impl HealthCoordinator {
    /// Builds the coordinator from whatever the store currently holds.
    pub async fn load(store: RecordStore, clock: Arc<dyn Clock>) -> Self {
        let log = store.load_test_results().await;
        info!("Health state loaded with {} test results", log.len());

        Self {
            store,
            clock,
            log: Mutex::new(log),
            version: AtomicU64::new(0),
            subscribers: Arc::new(StdMutex::new(Subscribers::default())),
        }
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub fn version(&self) -> u64 {
        self.version.load(Ordering::SeqCst)
    }

    pub fn subscriber_count(&self) -> usize {
        lock_subscribers(&self.subscribers).listeners.len()
    }

    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&ChangeEvent) + Send + Sync + 'static,
    {
        let mut subscribers = lock_subscribers(&self.subscribers);
        let id = subscribers.next_id;
        subscribers.next_id += 1;
        subscribers.listeners.push((id, Arc::new(listener)));

        Subscription {
            id,
            subscribers: Arc::downgrade(&self.subscribers),
        }
    }

    pub async fn results(&self) -> Vec<TestResult> {
        self.log.lock().await.clone()
    }

    pub async fn result(&self, id: Uuid) -> Option<TestResult> {
        self.log
            .lock()
            .await
            .iter()
            .find(|result| result.id == id)
            .cloned()
    }

    pub async fn append_result(self: &Arc<Self>, result: TestResult) -> HealthResult<ChangeEvent> {
        let this = Arc::clone(self);
        run_to_completion(async move {
            let id = result.id;
            {
                let mut log = this.log.lock().await;
                *log = this.store.append_test_result(&result).await?;
            }

            info!("Stored test result {id}");
            Ok(this.publish(ChangeReason::ResultAppended(id)))
        })
        .await
    }

    pub async fn delete_result(self: &Arc<Self>, id: Uuid) -> HealthResult<TestResult> {
        let this = Arc::clone(self);
        run_to_completion(async move {
            let removed = {
                let mut log = this.log.lock().await;
                let outcome = this.store.delete_test_result_by_id(id).await?;
                *log = outcome.remaining;
                outcome.removed
            };

            info!("Deleted test result {id}");
            this.publish(ChangeReason::ResultDeleted(id));
            Ok(removed)
        })
        .await
    }

    /// Delete by display position. Prefer [`Self::delete_result`].
    pub async fn delete_result_at(self: &Arc<Self>, index: usize) -> HealthResult<TestResult> {
        let this = Arc::clone(self);
        run_to_completion(async move {
            let removed = {
                let mut log = this.log.lock().await;
                let outcome = this.store.delete_test_result(index).await?;
                *log = outcome.remaining;
                outcome.removed
            };

            info!("Deleted test result {} at position {index}", removed.id);
            this.publish(ChangeReason::ResultDeleted(removed.id));
            Ok(removed)
        })
        .await
    }

    /// Tell dependents to re-read storage after a screen wrote to it directly.
    pub fn trigger_refresh(&self) -> ChangeEvent {
        self.publish(ChangeReason::Refreshed)
    }

    /// Replace the in-memory log with what storage holds now.
    pub async fn reload(&self) -> ChangeEvent {
        {
            let mut log = self.log.lock().await;
            *log = self.store.load_test_results().await;
        }
        self.publish(ChangeReason::Reloaded)
    }

    /// Wipe storage and empty the in-memory log. Used by logout.
    pub async fn reset_after_wipe(self: &Arc<Self>) -> HealthResult<ChangeEvent> {
        let this = Arc::clone(self);
        run_to_completion(async move {
            {
                let mut log = this.log.lock().await;
                this.store.clear_all().await?;
                log.clear();
            }

            warn!("Local health data cleared");
            Ok(this.publish(ChangeReason::Cleared))
        })
        .await
    }

    fn publish(&self, reason: ChangeReason) -> ChangeEvent {
        let version = self.version.fetch_add(1, Ordering::SeqCst) + 1;
        let event = ChangeEvent { version, reason };

        // Snapshot so a listener may unsubscribe from inside its callback.
        let listeners: Vec<Listener> = lock_subscribers(&self.subscribers)
            .listeners
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();

        debug!(
            "Health state version {version} ({reason:?}) -> {} subscribers",
            listeners.len()
        );
        for listener in listeners {
            listener(&event);
        }

        event
    }
}
