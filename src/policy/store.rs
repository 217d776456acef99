use std::collections::BTreeMap;

use serde_json::Value;
use tokio::sync::Mutex;

use crate::errors::GuardError;
use crate::policy::{KeyValueHandle, Policy};

/// Stored map with each domain entry still in its raw form. Entries are
/// decoded one at a time on read.
type RawPolicyMap = BTreeMap<String, Value>;

/// Domain → [`Policy`] mapping persisted under a single key-value entry.
///
/// Reads never fail: a missing or unreadable policy yields an empty one.
/// Writes read-modify-write the whole map under an async mutex, so two
/// concurrent writes never lose each other's update, and a concurrent read
/// sees either the previous or the new map. A write only replaces the entry
/// of its own domain; every other entry is written back as it was read.
pub struct PolicyStore {
    kv: KeyValueHandle,
    /// Key under which the whole map is stored.
    key: String,
    write_lock: Mutex<()>,
}

impl PolicyStore {
    pub fn new(kv: KeyValueHandle, key: impl Into<String>) -> Self {
        Self {
            kv,
            key: key.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Returns the stored policy for `domain`, or a fresh empty one.
    pub async fn get(&self, domain: &str) -> Policy {
        match self.try_get(domain).await {
            Ok(policy) => policy,
            Err(e) => {
                log::warn!("policy read for '{domain}' failed, using empty policy: {e}");
                Policy::default()
            }
        }
    }

    /// Like [`get`](Self::get) but reports storage failures.
    pub async fn try_get(&self, domain: &str) -> Result<Policy, GuardError> {
        let mut map = self.load().await.map_err(GuardError::PlatformUnavailable)?;
        Ok(map.remove(domain).map(|raw| self.decode(domain, raw)).unwrap_or_default())
    }

    /// Persists `policy` for `domain`, replacing the previous one.
    pub async fn set(&self, domain: &str, policy: Policy) -> Result<(), GuardError> {
        let _guard = self.write_lock.lock().await;

        let mut map = self.load().await.map_err(|source| GuardError::PersistenceWrite {
            domain: domain.to_string(),
            source,
        })?;
        map.insert(domain.to_string(), serde_json::to_value(&policy)?);
        self.save(domain, map).await
    }

    /// Deletes the policy for `domain`. Deleting an absent policy is a no-op.
    pub async fn remove(&self, domain: &str) -> Result<(), GuardError> {
        let _guard = self.write_lock.lock().await;

        let mut map = self.load().await.map_err(|source| GuardError::PersistenceWrite {
            domain: domain.to_string(),
            source,
        })?;
        if map.remove(domain).is_none() {
            return Ok(());
        }
        self.save(domain, map).await
    }

    /// All domains with a stored policy, sorted.
    pub async fn domains(&self) -> Vec<String> {
        match self.load().await {
            Ok(map) => map.into_keys().collect(),
            Err(e) => {
                log::warn!("policy map read failed: {e}");
                Vec::new()
            }
        }
    }

    async fn load(&self) -> anyhow::Result<RawPolicyMap> {
        let Some(raw) = self.kv.get(&self.key).await? else {
            return Ok(RawPolicyMap::new());
        };

        match raw {
            Value::Object(entries) => Ok(entries.into_iter().collect()),
            other => {
                // Not a map at all; the next write replaces it.
                log::warn!("stored policy map under '{}' is not an object, ignoring it: {other}", self.key);
                Ok(RawPolicyMap::new())
            }
        }
    }

    fn decode(&self, domain: &str, raw: Value) -> Policy {
        serde_json::from_value(raw).unwrap_or_else(|e| {
            log::warn!("stored policy for '{domain}' is malformed, using empty policy: {e}");
            Policy::default()
        })
    }

    async fn save(&self, domain: &str, map: RawPolicyMap) -> Result<(), GuardError> {
        let value = Value::Object(map.into_iter().collect());
        self.kv
            .set(&self.key, value)
            .await
            .map_err(|source| GuardError::PersistenceWrite {
                domain: domain.to_string(),
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{InMemoryKeyValueStore, KeyValueStore};
    use serde_json::json;
    use std::sync::Arc;

    fn store() -> (Arc<InMemoryKeyValueStore>, PolicyStore) {
        let kv = Arc::new(InMemoryKeyValueStore::new());
        (kv.clone(), PolicyStore::new(kv, "policies"))
    }

    #[tokio::test]
    async fn absent_domain_yields_empty_policy() {
        let (_, store) = store();
        assert_eq!(store.get("nowhere.test").await, Policy::default());
        assert!(store.domains().await.is_empty());
    }

    #[tokio::test]
    async fn set_then_get_and_storage_shape() {
        let (kv, store) = store();
        let mut policy = Policy::new();
        policy.block(["cart_sig"]);

        store.set("shop.example", policy.clone()).await.unwrap();
        assert_eq!(store.get("shop.example").await, policy);
        assert_eq!(
            kv.get("policies").await.unwrap(),
            Some(json!({"shop.example": {"blockedCookies": ["cart_sig"]}}))
        );
    }

    #[tokio::test]
    async fn remove_clears_one_domain() {
        let (_, store) = store();
        let mut p = Policy::new();
        p.block(["x"]);
        store.set("a.test", p.clone()).await.unwrap();
        store.set("b.test", p.clone()).await.unwrap();

        store.remove("a.test").await.unwrap();
        store.remove("a.test").await.unwrap();
        assert_eq!(store.domains().await, vec!["b.test".to_string()]);
    }

    #[tokio::test]
    async fn malformed_map_reads_as_empty_and_is_replaced() {
        let (kv, store) = store();
        kv.set("policies", json!("garbage")).await.unwrap();

        assert_eq!(store.get("a.test").await, Policy::default());

        let mut p = Policy::new();
        p.block(["x"]);
        store.set("a.test", p.clone()).await.unwrap();
        assert_eq!(store.get("a.test").await, p);
    }

    #[tokio::test]
    async fn malformed_entry_does_not_cost_other_domains() {
        let (kv, store) = store();
        kv.set(
            "policies",
            json!({"good.test": {"blockedCookies": ["keep_me"]}, "bad.test": {"blockedCookies": "oops"}}),
        )
        .await
        .unwrap();

        assert_eq!(store.get("bad.test").await, Policy::default());
        assert!(store.get("good.test").await.is_blocked("keep_me"));

        let mut p = Policy::new();
        p.block(["x"]);
        store.set("other.test", p).await.unwrap();

        assert!(store.get("good.test").await.is_blocked("keep_me"));
        assert!(store.get("other.test").await.is_blocked("x"));
        assert_eq!(
            kv.get("policies").await.unwrap(),
            Some(json!({
                "bad.test": {"blockedCookies": "oops"},
                "good.test": {"blockedCookies": ["keep_me"]},
                "other.test": {"blockedCookies": ["x"]},
            }))
        );

        // rewriting the bad entry repairs it
        let mut fixed = Policy::new();
        fixed.block(["y"]);
        store.set("bad.test", fixed.clone()).await.unwrap();
        assert_eq!(store.get("bad.test").await, fixed);
    }

    #[tokio::test]
    async fn concurrent_writes_for_different_domains_keep_both() {
        let (_, store) = store();
        let store = Arc::new(store);

        let mut tasks = Vec::new();
        for i in 0..16 {
            let store = store.clone();
            tasks.push(tokio::spawn(async move {
                let mut p = Policy::new();
                p.block([format!("c{i}")]);
                store.set(&format!("d{i}.test"), p).await.unwrap();
            }));
        }
        for t in tasks {
            t.await.unwrap();
        }

        assert_eq!(store.domains().await.len(), 16);
    }
}
