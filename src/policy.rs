// src/policy.rs
//! Block policies: the [`Policy`] type, the [`PolicyStore`] and its
//! key-value persistence backends.
//!
//! A policy is the set of cookie names a user chose to block on one domain.
//! Policies live in a single domain→policy map persisted under one key of a
//! [`KeyValueStore`]. The map is read, modified and written back as a whole;
//! [`PolicyStore`] serializes those writes so two domains never clobber each
//! other.
//!
//! # Backends
//!
//! - [`InMemoryKeyValueStore`]: ephemeral, the default for tests and private sessions.
//! - [`JsonKeyValueStore`]: a single JSON file, replaced atomically on each write.
//! - [`SqliteKeyValueStore`]: SQLite via an `r2d2` pool (feature `sqlite_policy_store`).
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use gosub_cookie_guard::policy::{JsonKeyValueStore, PolicyStore};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let kv = Arc::new(JsonKeyValueStore::new("policies.json".into())?);
//! let store = PolicyStore::new(kv, "policies");
//! let policy = store.get("shop.example").await;
//! assert!(policy.blocked_cookies.is_empty());
//! # Ok(()) }
//! ```

mod kv;
mod store;
mod types;

pub use kv::in_memory::InMemoryKeyValueStore;
pub use kv::json::JsonKeyValueStore;
#[cfg(feature = "sqlite_policy_store")]
pub use kv::sqlite::SqliteKeyValueStore;
pub use kv::{KeyValueHandle, KeyValueStore};

pub use store::PolicyStore;
pub use types::Policy;
