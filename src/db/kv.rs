use anyhow::Result;
use async_trait::async_trait;

/// Durable string-keyed storage. Values are UTF-8 JSON text.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Replace the whole value stored under `key`.
    async fn set(&self, key: &str, value: String) -> Result<()>;

    async fn remove(&self, key: &str) -> Result<()>;

    /// Drop every key. Succeeds on an already-empty store.
    async fn clear(&self) -> Result<()>;
}
