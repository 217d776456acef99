use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use serde_json::Value;

use crate::policy::KeyValueStore;

/// In‑memory key-value store (no persistence). Used as a default when the host
/// provides no storage.
#[derive(Debug, Default)]
pub struct InMemoryKeyValueStore {
    map: RwLock<HashMap<String, Value>>,
}

impl InMemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.map.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl KeyValueStore for InMemoryKeyValueStore {
    async fn get(&self, key: &str) -> anyhow::Result<Option<Value>> {
        Ok(self.map.read().unwrap_or_else(PoisonError::into_inner).get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> anyhow::Result<()> {
        self.map
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> anyhow::Result<()> {
        self.map.write().unwrap_or_else(PoisonError::into_inner).remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn kv_contract() {
        let store = InMemoryKeyValueStore::new();

        assert!(store.is_empty());
        assert!(store.get("missing").await.unwrap().is_none());

        store.set("a", json!({"x": 1})).await.unwrap();
        store.set("b", json!([1, 2])).await.unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.get("a").await.unwrap(), Some(json!({"x": 1})));

        // overwrite keeps len
        store.set("a", json!("ONE")).await.unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.get("a").await.unwrap(), Some(json!("ONE")));

        store.remove("b").await.unwrap();
        store.remove("b").await.unwrap();
        assert_eq!(store.len(), 1);
        assert!(store.get("b").await.unwrap().is_none());
    }
}
