//! Key-value persistence capability.
//!
//! This is the browser's extension storage as seen by the [`PolicyStore`](super::PolicyStore):
//! a flat map from string keys to JSON values. A `set` replaces the whole value
//! for its key; readers observe either the old or the new value.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

pub mod in_memory;
pub mod json;
#[cfg(feature = "sqlite_policy_store")]
pub mod sqlite;

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Returns the value stored under `key`, or `None` if unset.
    async fn get(&self, key: &str) -> anyhow::Result<Option<Value>>;

    /// Stores `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: Value) -> anyhow::Result<()>;

    /// Removes `key`. Removing an unset key is not an error.
    async fn remove(&self, key: &str) -> anyhow::Result<()>;
}

/// A reference-counted pointer to a type-erased [`KeyValueStore`].
pub type KeyValueHandle = Arc<dyn KeyValueStore>;
