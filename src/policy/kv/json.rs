//! JSON-backed key-value store.
//!
//! `JsonKeyValueStore` persists **all keys** in a single JSON object on disk.
//!
//! ### Design
//! - One file for all keys (`{ "<key>": <value>, ... }`).
//! - Every mutation **reads then rewrites** the whole file. Writes go to a
//!   sibling `*.tmp` file which is then renamed over the original, so readers
//!   see either the previous or the new contents.
//! - An async mutex serializes mutations within one process.
//!
//! ### Caveats
//! - Not suitable for large datasets; use the SQLite store for those.
//! - Other processes writing the same file are not coordinated.
//!
//! ### Example
//! ```ignore
//! let kv = Arc::new(JsonKeyValueStore::new("policies.json".into())?);
//! let store = PolicyStore::new(kv, "policies");
//! ```

use std::path::PathBuf;

use anyhow::Context;
use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::Mutex;

use crate::policy::KeyValueStore;

pub struct JsonKeyValueStore {
    /// Path to the JSON file where all keys are stored.
    path: PathBuf,
    /// Serializes read-modify-write cycles on the file.
    write_lock: Mutex<()>,
}

impl JsonKeyValueStore {
    /// Creates (or opens) a JSON store at `path`.
    ///
    /// If the file does not exist, an empty object is written to disk.
    pub fn new(path: PathBuf) -> anyhow::Result<Self> {
        if !path.exists() {
            std::fs::write(&path, b"{}")
                .with_context(|| format!("cannot create store file {}", path.display()))?;
        }

        Ok(Self {
            path,
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Loads and parses the full store file. An empty file is an empty store.
    async fn load_file(&self) -> anyhow::Result<Map<String, Value>> {
        let contents = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("cannot read store file {}", self.path.display()))?;
        if contents.trim().is_empty() {
            return Ok(Map::new());
        }

        match serde_json::from_str::<Value>(&contents)
            .with_context(|| format!("store file {} is not valid JSON", self.path.display()))?
        {
            Value::Object(map) => Ok(map),
            other => anyhow::bail!(
                "store file {} holds {} instead of an object",
                self.path.display(),
                type_name(&other)
            ),
        }
    }

    /// Serializes the full map into a temp file and renames it into place.
    async fn save_file(&self, map: Map<String, Value>) -> anyhow::Result<()> {
        let contents = serde_json::to_vec_pretty(&Value::Object(map))?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        tokio::fs::write(&tmp, contents)
            .await
            .with_context(|| format!("cannot write {}", tmp.display()))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .with_context(|| format!("cannot replace {}", self.path.display()))?;
        Ok(())
    }
}

fn type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[async_trait]
impl KeyValueStore for JsonKeyValueStore {
    async fn get(&self, key: &str) -> anyhow::Result<Option<Value>> {
        Ok(self.load_file().await?.remove(key))
    }

    async fn set(&self, key: &str, value: Value) -> anyhow::Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut map = self.load_file().await?;
        map.insert(key.to_string(), value);
        self.save_file(map).await
    }

    async fn remove(&self, key: &str) -> anyhow::Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut map = self.load_file().await?;
        if map.remove(key).is_some() {
            self.save_file(map).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kv.json");

        {
            let store = JsonKeyValueStore::new(path.clone()).unwrap();
            store.set("policies", json!({"a.test": {"blockedCookies": ["x"]}})).await.unwrap();
            store.set("other", json!(1)).await.unwrap();
            store.remove("other").await.unwrap();
        }

        let reopened = JsonKeyValueStore::new(path.clone()).unwrap();
        assert_eq!(
            reopened.get("policies").await.unwrap(),
            Some(json!({"a.test": {"blockedCookies": ["x"]}}))
        );
        assert!(reopened.get("other").await.unwrap().is_none());

        let mut tmp = path.into_os_string();
        tmp.push(".tmp");
        assert!(!PathBuf::from(tmp).exists());
    }

    #[tokio::test]
    async fn corrupt_file_is_an_error_not_a_panic() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kv.json");
        std::fs::write(&path, "[1,2,3]").unwrap();

        let store = JsonKeyValueStore::new(path.clone()).unwrap();
        assert!(store.get("policies").await.is_err());
        assert!(store.set("policies", json!({})).await.is_err());

        std::fs::write(&path, "").unwrap();
        assert!(store.get("policies").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn missing_directory_fails_on_creation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope").join("kv.json");
        assert!(JsonKeyValueStore::new(path).is_err());
    }
}
