//! Short-lived enumeration cache.
//!
//! `GET_STATE` may answer from a recent enumeration while `FORCE_STATE` must
//! always hit the platform. [`CachingCookieSource`] wraps any source and keeps
//! the last result per URL for a bounded time. Removals through the cache
//! invalidate every cached URL on the same host, and expired entries are
//! dropped whenever a new enumeration is stored.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use url::Url;

use crate::cookies::{Cookie, CookieSource, CookieSourceHandle};

struct CachedList {
    fetched_at: Instant,
    host: String,
    cookies: Vec<Cookie>,
}

pub struct CachingCookieSource {
    inner: CookieSourceHandle,
    ttl: Duration,
    entries: RwLock<HashMap<String, CachedList>>,
}

impl CachingCookieSource {
    pub fn new(inner: CookieSourceHandle, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Enumerates through the inner source, refreshing the cache.
    pub async fn list_fresh(&self, url: &Url) -> anyhow::Result<Vec<Cookie>> {
        let cookies = self.inner.list(url).await?;

        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.retain(|_, cached| cached.fetched_at.elapsed() < self.ttl);
        entries.insert(
            url.as_str().to_string(),
            CachedList {
                fetched_at: Instant::now(),
                host: url.host_str().unwrap_or_default().to_string(),
                cookies: cookies.clone(),
            },
        );
        drop(entries);

        Ok(cookies)
    }

    /// Drops cached enumerations for every URL on `host`.
    pub fn invalidate_host(&self, host: &str) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|_, cached| !cached.host.eq_ignore_ascii_case(host));
    }

    /// The enumeration cached for `url`, if it is younger than the TTL.
    pub fn cached(&self, url: &Url) -> Option<Vec<Cookie>> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries
            .get(url.as_str())
            .filter(|cached| cached.fetched_at.elapsed() < self.ttl)
            .map(|cached| cached.cookies.clone())
    }
}

#[async_trait]
impl CookieSource for CachingCookieSource {
    async fn list(&self, url: &Url) -> anyhow::Result<Vec<Cookie>> {
        if let Some(cookies) = self.cached(url) {
            log::debug!("cookie cache hit for {url}");
            return Ok(cookies);
        }
        self.list_fresh(url).await
    }

    async fn remove(&self, url: &Url, name: &str) -> anyhow::Result<()> {
        let result = self.inner.remove(url, name).await;
        self.invalidate_host(url.host_str().unwrap_or_default());
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cookies::InMemoryCookieSource;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Default)]
    struct CountingSource {
        inner: InMemoryCookieSource,
        lists: AtomicUsize,
    }

    #[async_trait]
    impl CookieSource for CountingSource {
        async fn list(&self, url: &Url) -> anyhow::Result<Vec<Cookie>> {
            self.lists.fetch_add(1, Ordering::SeqCst);
            self.inner.list(url).await
        }

        async fn remove(&self, url: &Url, name: &str) -> anyhow::Result<()> {
            self.inner.remove(url, name).await
        }
    }

    fn u(s: &str) -> Url {
        Url::parse(s).expect("valid URL")
    }

    #[tokio::test]
    async fn reuses_recent_enumeration_until_forced() {
        let counting = Arc::new(CountingSource::default());
        counting.inner.set_cookie("a.test", Cookie::new("x", "a.test"));
        let cache = CachingCookieSource::new(counting.clone(), Duration::from_secs(60));
        let url = u("https://a.test/");

        cache.list(&url).await.unwrap();
        cache.list(&url).await.unwrap();
        assert_eq!(counting.lists.load(Ordering::SeqCst), 1);

        cache.list_fresh(&url).await.unwrap();
        assert_eq!(counting.lists.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn zero_ttl_never_reuses() {
        let counting = Arc::new(CountingSource::default());
        let cache = CachingCookieSource::new(counting.clone(), Duration::ZERO);
        let url = u("https://a.test/");

        cache.list(&url).await.unwrap();
        cache.list(&url).await.unwrap();
        assert_eq!(counting.lists.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn expired_entries_are_dropped_on_insert() {
        let counting = Arc::new(CountingSource::default());
        let cache = CachingCookieSource::new(counting.clone(), Duration::from_millis(20));

        cache.list(&u("https://a.test/")).await.unwrap();
        cache.list(&u("https://b.test/")).await.unwrap();
        assert_eq!(cache.entries.read().unwrap().len(), 2);

        tokio::time::sleep(Duration::from_millis(40)).await;
        cache.list(&u("https://c.test/")).await.unwrap();

        let entries = cache.entries.read().unwrap();
        assert_eq!(entries.len(), 1);
        assert!(entries.contains_key("https://c.test/"));
    }

    #[tokio::test]
    async fn removal_invalidates_host() {
        let counting = Arc::new(CountingSource::default());
        counting.inner.set_cookie("a.test", Cookie::new("x", "a.test"));
        let cache = CachingCookieSource::new(counting.clone(), Duration::from_secs(60));
        let page = u("https://a.test/page");

        assert_eq!(cache.list(&page).await.unwrap().len(), 1);
        cache.remove(&u("https://a.test/"), "x").await.unwrap();
        assert!(cache.list(&page).await.unwrap().is_empty());
        assert_eq!(counting.lists.load(Ordering::SeqCst), 2);
    }
}
