use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, OptionalExtension};

use crate::db::{Database, KeyValueStore};

impl Database {
    pub async fn get_entry(&self, key: &str) -> Result<Option<String>> {
        let key = key.to_string();
        self.execute(move |conn| {
            conn.query_row(
                "SELECT value FROM kv_entries WHERE key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()
            .with_context(|| format!("failed to read entry '{key}'"))
        })
        .await
    }

    pub async fn upsert_entry(&self, key: &str, value: String) -> Result<()> {
        let key = key.to_string();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO kv_entries (key, value, updated_at)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET
                     value = excluded.value,
                     updated_at = excluded.updated_at",
                params![key, value, Utc::now().to_rfc3339()],
            )
            .with_context(|| format!("failed to write entry '{key}'"))?;
            Ok(())
        })
        .await
    }

    pub async fn delete_entry(&self, key: &str) -> Result<()> {
        let key = key.to_string();
        self.execute(move |conn| {
            conn.execute("DELETE FROM kv_entries WHERE key = ?1", params![key])
                .with_context(|| format!("failed to delete entry '{key}'"))?;
            Ok(())
        })
        .await
    }

    pub async fn delete_all_entries(&self) -> Result<()> {
        self.execute(|conn| {
            conn.execute("DELETE FROM kv_entries", [])
                .context("failed to clear entries")?;
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl KeyValueStore for Database {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.get_entry(key).await
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        self.upsert_entry(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.delete_entry(key).await
    }

    async fn clear(&self) -> Result<()> {
        self.delete_all_entries().await
    }
}
