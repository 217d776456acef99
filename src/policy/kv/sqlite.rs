//! SQLite-backed key-value store.
//!
//! One table (`kv_store`) holds every key; each row is one JSON value. Access
//! goes through an `r2d2` pool, and every query runs on tokio's blocking pool
//! so async callers never stall the runtime.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::rusqlite::{params, OpenFlags, OptionalExtension};
use r2d2_sqlite::SqliteConnectionManager;
use serde_json::Value;

use crate::policy::KeyValueStore;

/// SQLite-based key-value store.
pub struct SqliteKeyValueStore {
    pool: Pool<SqliteConnectionManager>,
}

impl SqliteKeyValueStore {
    /// Opens (or creates) the database at `path` and ensures the schema exists.
    pub fn new(path: &str) -> Result<Self> {
        let manager = SqliteConnectionManager::file(path)
            .with_flags(
                OpenFlags::SQLITE_OPEN_READ_WRITE |
                    OpenFlags::SQLITE_OPEN_CREATE |
                    OpenFlags::SQLITE_OPEN_URI
            )
            .with_init(|c| {
                c.busy_timeout(Duration::from_millis(500))?;
                c.pragma_update(None, "journal_mode", &"WAL")?;
                c.execute_batch(
                    "CREATE TABLE IF NOT EXISTS kv_store (
                        key TEXT NOT NULL PRIMARY KEY,
                        value TEXT NOT NULL,
                        updated_at INTEGER NOT NULL DEFAULT (strftime('%s','now'))
                    );"
                )?;
                Ok(())
            });

        let pool = Pool::builder()
            .max_size(16)
            .connection_timeout(Duration::from_secs(5))
            .build(manager)?;

        Ok(Self { pool })
    }

    /// Runs `f` with a pooled connection on the blocking pool.
    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(PooledConnection<SqliteConnectionManager>) -> Result<T> + Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            f(conn)
        })
        .await?
    }
}

#[async_trait]
impl KeyValueStore for SqliteKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let key = key.to_string();
        let raw: Option<String> = self
            .with_conn(move |conn| {
                Ok(conn
                    .query_row("SELECT value FROM kv_store WHERE key=?1", params![key], |row| {
                        row.get::<_, String>(0)
                    })
                    .optional()?)
            })
            .await?;

        match raw {
            Some(text) => Ok(Some(serde_json::from_str(&text)?)),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        let key = key.to_string();
        let text = serde_json::to_string(&value)?;
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO kv_store(key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE
                 SET value=excluded.value, updated_at=strftime('%s','now')",
                params![key, text],
            )?;
            Ok(())
        })
        .await
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let key = key.to_string();
        self.with_conn(move |conn| {
            conn.execute("DELETE FROM kv_store WHERE key=?1", params![key])?;
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn kv_contract_and_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("policies.db");
        let path = path.to_str().unwrap();

        {
            let store = SqliteKeyValueStore::new(path).unwrap();
            assert!(store.get("policies").await.unwrap().is_none());

            store.set("policies", json!({"a.test": {"blockedCookies": ["x"]}})).await.unwrap();
            store.set("policies", json!({"a.test": {"blockedCookies": ["y"]}})).await.unwrap();
            store.set("tmp", json!(true)).await.unwrap();
            store.remove("tmp").await.unwrap();
        }

        let store = SqliteKeyValueStore::new(path).unwrap();
        assert_eq!(
            store.get("policies").await.unwrap(),
            Some(json!({"a.test": {"blockedCookies": ["y"]}}))
        );
        assert!(store.get("tmp").await.unwrap().is_none());
    }
}
