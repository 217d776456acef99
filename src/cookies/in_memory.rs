//! In-memory cookie source.
//!
//! Cookies are bucketed by the **host** they were set for. A request URL sees
//! every cookie whose domain attribute matches its host (exact or subdomain),
//! filtered by the `Secure` flag. There is no expiration or eviction.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use url::Url;

use crate::cookies::{Cookie, CookieSource};

#[derive(Debug, Default)]
pub struct InMemoryCookieSource {
    /// Key: host the cookie was set from. Value: cookie records for that host.
    entries: RwLock<HashMap<String, Vec<Cookie>>>,
}

impl InMemoryCookieSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `cookie` for `host`, replacing an existing cookie with the same name.
    pub fn set_cookie(&self, host: &str, mut cookie: Cookie) {
        cookie.present = true;
        if cookie.domain.is_empty() {
            cookie.domain = host.to_string();
        }

        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let bucket = entries.entry(host.to_ascii_lowercase()).or_default();
        if let Some(existing) = bucket.iter_mut().find(|c| c.name == cookie.name) {
            *existing = cookie;
        } else {
            bucket.push(cookie);
        }
    }

    /// Number of stored cookies across all hosts.
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .map(Vec::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries.write().unwrap_or_else(PoisonError::into_inner).clear();
    }
}

#[async_trait]
impl CookieSource for InMemoryCookieSource {
    async fn list(&self, url: &Url) -> anyhow::Result<Vec<Cookie>> {
        let host = url.host_str().unwrap_or_default();
        let is_https = url.scheme() == "https";

        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let cookies = entries
            .values()
            .flatten()
            .filter(|cookie| cookie.matches_host(host))
            .filter(|cookie| !cookie.secure || is_https)
            .cloned()
            .collect();

        Ok(cookies)
    }

    async fn remove(&self, url: &Url, name: &str) -> anyhow::Result<()> {
        let host = url.host_str().unwrap_or_default();

        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        for bucket in entries.values_mut() {
            bucket.retain(|c| !(c.name == name && c.matches_host(host)));
        }
        entries.retain(|_, bucket| !bucket.is_empty());
        Ok(())
    }
}
