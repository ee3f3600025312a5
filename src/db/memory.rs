use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Mutex, MutexGuard,
    },
};

use anyhow::{bail, Result};
use async_trait::async_trait;

use super::KeyValueStore;

/// In-process storage for previews and tests. Writes can be switched to
/// fail to simulate a full disk.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, String>> {
        match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn check_writable(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            bail!("storage rejected the write");
        }
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries().get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        self.check_writable()?;
        self.entries().insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.check_writable()?;
        self.entries().remove(key);
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.check_writable()?;
        self.entries().clear();
        Ok(())
    }
}

/// Applies each write, then holds the caller until `release` is notified.
/// Lets tests drop a caller after its write has landed.
#[cfg(test)]
#[derive(Default)]
pub(crate) struct SlowWriteStore {
    pub(crate) inner: MemoryStore,
    pub(crate) release: tokio::sync::Notify,
}

#[cfg(test)]
#[async_trait]
impl KeyValueStore for SlowWriteStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        self.inner.set(key, value).await?;
        self.release.notified().await;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.inner.remove(key).await?;
        self.release.notified().await;
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.inner.clear().await
    }
}
